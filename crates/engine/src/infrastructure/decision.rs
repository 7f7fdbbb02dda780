//! AI decision policy for non-player actors.

use std::collections::HashSet;

use async_trait::async_trait;
use tactica_domain::AbilityId;

use crate::infrastructure::ports::{Decision, DecisionError, DecisionPort, ReactionPrompt};

/// Always takes the reaction with the first offered option, except for
/// abilities it has been told to hold back.
#[derive(Debug, Default)]
pub struct AiDecisionPolicy {
    declines: HashSet<AbilityId>,
}

impl AiDecisionPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declining(mut self, ability: AbilityId) -> Self {
        self.declines.insert(ability);
        self
    }
}

#[async_trait]
impl DecisionPort for AiDecisionPolicy {
    async fn decide(&self, prompt: ReactionPrompt) -> Result<Decision, DecisionError> {
        if self.declines.contains(&prompt.ability) {
            tracing::debug!(
                owner = %prompt.owner,
                ability = %prompt.ability_name,
                "AI declines reaction"
            );
            return Ok(Decision::Decline);
        }

        let decision = if prompt.is_multiple_choice() {
            Decision::accept_choice(0)
        } else {
            Decision::accept()
        };
        tracing::debug!(
            owner = %prompt.owner,
            ability = %prompt.ability_name,
            question = %prompt.question(),
            "AI accepts reaction"
        );
        Ok(decision)
    }
}
