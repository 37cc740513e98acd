//! # Dialogue
//! Per-conversation state machine that collects [`SelectionCriteria`] over
//! successive turns and hands them to the filter engine.
//!
//! ```text
//! by agent:    Idle → DealType → AgentOrCategory → Category → Market → Confirm → Idle
//! by category: Idle → DealType → Category → Market → Confirm → Idle
//! admin:       Idle → FeedUrl → Idle
//! ```
//!
//! The main-menu token aborts from any state. [`DialogueSession::advance`] is
//! pure: it returns the next session (or `None` once the flow is over), the
//! replies to send, and at most one side effect for the dispatcher to run.

use crate::catalog::CatalogSnapshot;
use crate::filter::{self, strip_decoration, SelectionCriteria};
use crate::listing::ListingRecord;
use crate::transport::OutboundMessage;
use crate::ui;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowseFlow {
    ByAgent,
    ByCategory,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum DialogueState {
    #[default]
    Idle,
    AwaitingDealType {
        flow: BrowseFlow,
    },
    AwaitingAgentOrCategory,
    AwaitingCategory,
    AwaitingMarket,
    /// Results computed when the market was picked; revealed on confirmation.
    AwaitingConfirm {
        results: Vec<ListingRecord>,
    },
    AwaitingFeedUrl,
}

impl DialogueState {
    pub fn name(&self) -> &'static str {
        match self {
            DialogueState::Idle => "idle",
            DialogueState::AwaitingDealType { .. } => "awaiting_deal_type",
            DialogueState::AwaitingAgentOrCategory => "awaiting_agent",
            DialogueState::AwaitingCategory => "awaiting_category",
            DialogueState::AwaitingMarket => "awaiting_market",
            DialogueState::AwaitingConfirm { .. } => "awaiting_confirm",
            DialogueState::AwaitingFeedUrl => "awaiting_feed_url",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DialogueSession {
    pub state: DialogueState,
    pub criteria: SelectionCriteria,
}

/// Work the dispatcher performs after sending the transition's replies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    RefreshCatalog,
    SetFeedUrl(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outgoing {
    Message(OutboundMessage),
    /// Rendered as a listing card; consecutive cards are paced.
    Listing(ListingRecord),
}

pub struct TurnContext<'a> {
    pub catalog: &'a CatalogSnapshot,
    pub is_admin: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// `None` once the conversation is back at the top-level menu.
    pub next: Option<DialogueSession>,
    pub outgoing: Vec<Outgoing>,
    pub effect: Option<Effect>,
}

impl Transition {
    fn ask(state: DialogueState, criteria: SelectionCriteria, text: &str, kb: ui::Keyboard) -> Self {
        Self {
            next: Some(DialogueSession { state, criteria }),
            outgoing: vec![Outgoing::Message(OutboundMessage::with_keyboard(text, kb))],
            effect: None,
        }
    }

    fn menu(text: &str, ctx: &TurnContext<'_>) -> Self {
        Self {
            next: None,
            outgoing: vec![Outgoing::Message(OutboundMessage::with_keyboard(
                text,
                ui::main_keyboard(ctx.is_admin),
            ))],
            effect: None,
        }
    }

    fn effect(effect: Effect) -> Self {
        Self {
            next: None,
            outgoing: Vec::new(),
            effect: Some(effect),
        }
    }
}

pub fn is_main_menu(input: &str) -> bool {
    input.trim() == ui::MAIN_MENU
}

impl DialogueSession {
    pub fn is_idle(&self) -> bool {
        self.state == DialogueState::Idle
    }

    pub fn advance(self, input: &str, ctx: &TurnContext<'_>) -> Transition {
        let input = input.trim();
        if is_main_menu(input) {
            return Transition::menu(ui::BACK_TO_MENU, ctx);
        }

        let mut criteria = self.criteria;
        match self.state {
            DialogueState::Idle => idle(input, ctx),

            DialogueState::AwaitingDealType { flow } => {
                criteria.deal_type = Some(strip_decoration(input).to_string());
                match flow {
                    BrowseFlow::ByAgent => Transition::ask(
                        DialogueState::AwaitingAgentOrCategory,
                        criteria,
                        ui::ASK_AGENT,
                        ui::agent_keyboard(&ctx.catalog.agents),
                    ),
                    BrowseFlow::ByCategory => Transition::ask(
                        DialogueState::AwaitingCategory,
                        criteria,
                        ui::ASK_CATEGORY,
                        ui::category_keyboard(),
                    ),
                }
            }

            DialogueState::AwaitingAgentOrCategory => {
                let agent = input.strip_prefix(ui::AGENT_PREFIX).unwrap_or(input).trim();
                criteria.agent = Some(agent.to_string());
                Transition::ask(
                    DialogueState::AwaitingCategory,
                    criteria,
                    ui::ASK_CATEGORY,
                    ui::category_keyboard(),
                )
            }

            DialogueState::AwaitingCategory => {
                criteria.category = Some(input.to_string());
                Transition::ask(
                    DialogueState::AwaitingMarket,
                    criteria,
                    ui::ASK_MARKET,
                    ui::market_keyboard(),
                )
            }

            DialogueState::AwaitingMarket => {
                criteria.market = Some(input.to_string());
                let results = filter::apply(&criteria, &ctx.catalog.records);
                let text = ui::found_count(results.len());
                Transition::ask(
                    DialogueState::AwaitingConfirm { results },
                    criteria,
                    &text,
                    ui::confirm_keyboard(),
                )
            }

            DialogueState::AwaitingConfirm { results } => {
                let mut outgoing = Vec::new();
                if input == ui::REVEAL {
                    outgoing.extend(results.into_iter().map(Outgoing::Listing));
                }
                outgoing.push(Outgoing::Message(OutboundMessage::with_keyboard(
                    ui::MENU,
                    ui::main_keyboard(ctx.is_admin),
                )));
                Transition {
                    next: None,
                    outgoing,
                    effect: None,
                }
            }

            DialogueState::AwaitingFeedUrl => {
                if !ctx.is_admin {
                    return Transition::menu(ui::MENU, ctx);
                }
                Transition::effect(Effect::SetFeedUrl(input.to_string()))
            }
        }
    }
}

fn idle(input: &str, ctx: &TurnContext<'_>) -> Transition {
    let fresh = SelectionCriteria::default();
    match input {
        ui::START => Transition::menu(ui::WELCOME, ctx),
        ui::BROWSE_BY_AGENT | ui::LEGACY_BROWSE_BY_AGENT => Transition::ask(
            DialogueState::AwaitingDealType {
                flow: BrowseFlow::ByAgent,
            },
            fresh,
            ui::ASK_DEAL_TYPE,
            ui::deal_type_keyboard(),
        ),
        ui::BROWSE_BY_CATEGORY | ui::LEGACY_BROWSE_BY_CATEGORY => Transition::ask(
            DialogueState::AwaitingDealType {
                flow: BrowseFlow::ByCategory,
            },
            fresh,
            ui::ASK_DEAL_TYPE,
            ui::deal_type_keyboard(),
        ),
        ui::REFRESH_DATA => Transition::effect(Effect::RefreshCatalog),
        ui::CHANGE_FEED_URL if ctx.is_admin => Transition::ask(
            DialogueState::AwaitingFeedUrl,
            fresh,
            ui::ASK_FEED_URL,
            ui::escape_keyboard(),
        ),
        _ => Transition::menu(ui::PICK_ACTION, ctx),
    }
}
