use std::fmt;

use super::errors::OrderError;
use super::events::EventKind;
use super::value_objects::OrderStatus;

// ============================================================================
// Order State Machine
// ============================================================================
//
// The lifecycle graph as data: each externally visible transition names the
// status it requires, the status it produces and the event it announces.
// The workflow service looks a rule up before touching the aggregate.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    Confirm,
    ReceiveConfirmed,
    StartPreparation,
    MarkReady,
    MarkDelivered,
}

impl Transition {
    pub fn name(self) -> &'static str {
        match self {
            Transition::Confirm => "confirm",
            Transition::ReceiveConfirmed => "receive_confirmed",
            Transition::StartPreparation => "start_preparation",
            Transition::MarkReady => "mark_ready",
            Transition::MarkDelivered => "mark_delivered",
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRule {
    pub transition: Transition,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub event: EventKind,
}

#[derive(Debug, Clone)]
pub struct TransitionTable {
    rules: Vec<TransitionRule>,
}

impl Default for TransitionTable {
    fn default() -> Self {
        Self::kitchen()
    }
}

impl TransitionTable {
    pub fn new(rules: Vec<TransitionRule>) -> Self {
        Self { rules }
    }

    /// The forward-only kitchen lifecycle.
    pub fn kitchen() -> Self {
        use OrderStatus::*;
        let rule = |transition, from, to, event| TransitionRule { transition, from, to, event };
        Self::new(vec![
            rule(Transition::Confirm, Pending, Confirmed, EventKind::Confirmed),
            rule(Transition::ReceiveConfirmed, Confirmed, Received, EventKind::Received),
            rule(Transition::StartPreparation, Received, Preparing, EventKind::Preparing),
            rule(Transition::MarkReady, Preparing, Ready, EventKind::Ready),
            rule(Transition::MarkDelivered, Ready, Delivered, EventKind::Delivered),
        ])
    }

    pub fn rule(&self, transition: Transition) -> Option<&TransitionRule> {
        self.rules.iter().find(|r| r.transition == transition)
    }

    pub fn rules(&self) -> &[TransitionRule] {
        &self.rules
    }

    /// Rule for `transition` if the order currently sits in its required status.
    pub fn resolve(
        &self,
        order_id: &str,
        transition: Transition,
        current: OrderStatus,
    ) -> Result<&TransitionRule, OrderError> {
        let rule = self.rule(transition).ok_or_else(|| OrderError::TransitionNotConfigured {
            order_id: order_id.to_string(),
            transition: transition.name().to_string(),
        })?;

        if rule.from != current {
            return Err(OrderError::InvalidStatusTransition {
                order_id: order_id.to_string(),
                expected: rule.from,
                actual: current,
            });
        }
        Ok(rule)
    }
}
