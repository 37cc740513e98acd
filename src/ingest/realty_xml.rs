// src/ingest/realty_xml.rs
//! Streaming reader for Yandex Realty feeds.
//!
//! Only elements bound to the feed namespace count. Offers are the direct
//! children of the root element named `offer`; every listing field is an
//! optional path below the offer where the first matching element wins.
//! Whatever an offer lacks is defaulted by [`ListingDraft::into_record`], so
//! only XML syntax errors abort the batch.
//!
//! Input is raw bytes: a BOM or the `encoding` of the XML declaration picks
//! the decoder, so windows-1251 feeds read the same as UTF-8 ones.

use quick_xml::Decoder;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;

use crate::ingest::types::RefreshError;
use crate::listing::{ListingDraft, ListingRecord};

pub const YANDEX_REALTY_NS: &str = "http://webmaster.yandex.ru/schemas/feed/realty/2010-06";

const OFFER: &[u8] = b"offer";
const OFFER_ID_ATTR: &str = "internal-id";

#[derive(Debug, Default)]
pub struct ParsedFeed {
    pub records: Vec<ListingRecord>,
    /// Fields filled with a default across all offers.
    pub defaulted_fields: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    DealType,
    Category,
    Rooms,
    Status,
    Price,
    Agent,
    District,
    Locality,
    SubLocality,
    Street,
    Area,
}

impl Field {
    const ALL: [Field; 11] = [
        Field::DealType,
        Field::Category,
        Field::Rooms,
        Field::Status,
        Field::Price,
        Field::Agent,
        Field::District,
        Field::Locality,
        Field::SubLocality,
        Field::Street,
        Field::Area,
    ];

    fn path(self) -> &'static [&'static str] {
        match self {
            Field::DealType => &["type"],
            Field::Category => &["category"],
            Field::Rooms => &["rooms"],
            Field::Status => &["status"],
            Field::Price => &["price", "value"],
            Field::Agent => &["sales-agent", "name"],
            Field::District => &["location", "district"],
            Field::Locality => &["location", "locality-name"],
            Field::SubLocality => &["location", "sub-locality-name"],
            Field::Street => &["location", "address"],
            Field::Area => &["area", "value"],
        }
    }

    /// Field addressed by a path of in-namespace local names; foreign elements are `None`.
    fn at(path: &[Option<String>]) -> Option<Field> {
        Field::ALL.into_iter().find(|f| {
            let want = f.path();
            want.len() == path.len()
                && want
                    .iter()
                    .zip(path)
                    .all(|(w, got)| got.as_deref() == Some(*w))
        })
    }

    fn slot(self, d: &mut ListingDraft) -> &mut Option<String> {
        match self {
            Field::DealType => &mut d.deal_type,
            Field::Category => &mut d.category,
            Field::Rooms => &mut d.rooms,
            Field::Status => &mut d.status,
            Field::Price => &mut d.price,
            Field::Agent => &mut d.agent,
            Field::District => &mut d.district,
            Field::Locality => &mut d.locality,
            Field::SubLocality => &mut d.sub_locality,
            Field::Street => &mut d.street,
            Field::Area => &mut d.area,
        }
    }
}

struct Capture {
    field: Field,
    depth: usize,
    text: String,
    /// Set once a child element opens; later text is tail text of that child.
    sealed: bool,
}

/// State for the offer currently being read.
struct OfferWalk {
    draft: ListingDraft,
    seen: Vec<Field>,
    path: Vec<Option<String>>,
    capture: Option<Capture>,
}

impl OfferWalk {
    fn new(id: Option<String>) -> Self {
        Self {
            draft: ListingDraft {
                id,
                ..Default::default()
            },
            seen: Vec::new(),
            path: Vec::new(),
            capture: None,
        }
    }

    fn enter(&mut self, name: Option<String>, depth: usize) {
        self.path.push(name);
        if let Some(c) = self.capture.as_mut() {
            c.sealed = true;
            return;
        }
        if let Some(field) = Field::at(&self.path) {
            if !self.seen.contains(&field) {
                self.seen.push(field);
                self.capture = Some(Capture {
                    field,
                    depth,
                    text: String::new(),
                    sealed: false,
                });
            }
        }
    }

    fn leave(&mut self, depth: usize) {
        if matches!(&self.capture, Some(c) if c.depth == depth) {
            if let Some(c) = self.capture.take() {
                let value = c.text.trim();
                if !value.is_empty() {
                    *c.field.slot(&mut self.draft) = Some(value.to_string());
                }
            }
        }
        self.path.pop();
    }

    /// Only the text before the first child element is the value.
    fn text(&mut self, depth: usize, s: &str) {
        if let Some(c) = self.capture.as_mut() {
            if c.depth == depth && !c.sealed {
                c.text.push_str(s);
            }
        }
    }
}

struct FeedWalker {
    depth: usize,
    roots: usize,
    offer: Option<OfferWalk>,
    parsed: ParsedFeed,
}

impl FeedWalker {
    fn open(&mut self, in_ns: bool, start: &BytesStart<'_>, decoder: Decoder) -> Result<(), RefreshError> {
        self.depth += 1;
        let local = start.local_name();
        match self.depth {
            1 => {
                self.roots += 1;
                if self.roots > 1 {
                    return Err(RefreshError::MalformedFeed(
                        "more than one root element".into(),
                    ));
                }
            }
            2 => {
                if in_ns && local.as_ref() == OFFER {
                    self.offer = Some(OfferWalk::new(offer_id(start, decoder)));
                }
            }
            d => {
                if let Some(o) = self.offer.as_mut() {
                    let name = in_ns.then(|| String::from_utf8_lossy(local.as_ref()).into_owned());
                    o.enter(name, d);
                }
            }
        }
        Ok(())
    }

    fn close(&mut self) {
        match self.depth {
            2 => {
                if let Some(o) = self.offer.take() {
                    self.parsed.defaulted_fields += o.draft.missing_fields();
                    self.parsed.records.push(o.draft.into_record());
                }
            }
            d if d > 2 => {
                if let Some(o) = self.offer.as_mut() {
                    o.leave(d);
                }
            }
            _ => {}
        }
        self.depth = self.depth.saturating_sub(1);
    }

    fn text(&mut self, s: &str) -> Result<(), RefreshError> {
        if self.depth == 0 {
            if s.trim().is_empty() {
                return Ok(());
            }
            return Err(RefreshError::MalformedFeed(
                "text outside the root element".into(),
            ));
        }
        if let Some(o) = self.offer.as_mut() {
            o.text(self.depth, s);
        }
        Ok(())
    }
}

fn offer_id(start: &BytesStart<'_>, decoder: Decoder) -> Option<String> {
    let attr = start.try_get_attribute(OFFER_ID_ATTR).ok().flatten()?;
    let value = attr.decode_and_unescape_value(decoder).ok()?;
    let v = value.trim();
    (!v.is_empty()).then(|| v.to_string())
}

/// Parse a whole feed document into listing records, in document order.
pub fn parse_feed(xml: &[u8], namespace: &str) -> Result<ParsedFeed, RefreshError> {
    let mut reader = NsReader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let ns = namespace.as_bytes();

    let mut walker = FeedWalker {
        depth: 0,
        roots: 0,
        offer: None,
        parsed: ParsedFeed::default(),
    };

    loop {
        let (resolved, event) = reader
            .read_resolved_event()
            .map_err(|e| RefreshError::MalformedFeed(e.to_string()))?;
        let in_ns = matches!(resolved, ResolveResult::Bound(Namespace(n)) if n == ns);
        // reflects the declared encoding once the declaration has been read
        let decoder = reader.decoder();

        match event {
            Event::Start(e) => walker.open(in_ns, &e, decoder)?,
            Event::Empty(e) => {
                walker.open(in_ns, &e, decoder)?;
                walker.close();
            }
            Event::End(_) => walker.close(),
            Event::Text(t) => {
                // An undecodable entity only costs the field it sits in.
                let s = t
                    .unescape()
                    .map(|c| c.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&t).into_owned());
                walker.text(&s)?;
            }
            Event::CData(c) => {
                let s = decoder
                    .decode(&c)
                    .map(|c| c.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&c).into_owned());
                walker.text(&s)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if walker.roots == 0 {
        return Err(RefreshError::MalformedFeed("document has no root element".into()));
    }
    if walker.depth != 0 {
        return Err(RefreshError::MalformedFeed(format!(
            "document ends with {} unclosed element(s)",
            walker.depth
        )));
    }
    Ok(walker.parsed)
}
