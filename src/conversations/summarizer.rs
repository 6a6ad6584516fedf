use crate::config::BudgetConfig;

use super::history::History;

/// Decides when history has grown past the token budget and words the
/// request that asks the remote model to condense it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummarizationPolicy {
    threshold: usize,
    max_summary_tokens: usize,
}

impl Default for SummarizationPolicy {
    fn default() -> Self {
        Self::from(BudgetConfig::default())
    }
}

impl From<BudgetConfig> for SummarizationPolicy {
    fn from(budget: BudgetConfig) -> Self {
        Self::new(budget.threshold, budget.max_summary_tokens)
    }
}

impl SummarizationPolicy {
    pub fn new(threshold: usize, max_summary_tokens: usize) -> Self {
        Self {
            threshold,
            max_summary_tokens,
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn should_compact(&self, estimated_tokens: usize) -> bool {
        estimated_tokens > self.threshold
    }

    pub fn summary_prompt(&self, history: &History) -> String {
        format!(
            "Please summarize the following conversation in less than {} tokens. DO NOT MODIFY FUNCTIONS.\n{}",
            self.max_summary_tokens,
            history.transcript()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_is_exclusive() {
        let policy = SummarizationPolicy::default();

        assert!(!policy.should_compact(0));
        assert!(!policy.should_compact(500));
        assert!(policy.should_compact(501));
    }

    #[test]
    fn test_summary_prompt_embeds_limit_and_transcript() {
        let policy = SummarizationPolicy::new(500, 50);
        let mut history = History::new();
        history.push_user("call randomNumber please");
        history.push_assistant("sure");

        let prompt = policy.summary_prompt(&history);

        assert_eq!(
            prompt,
            "Please summarize the following conversation in less than 50 tokens. DO NOT MODIFY FUNCTIONS.\n\
             user: call randomNumber please\nassistant: sure\n"
        );
    }

    #[test]
    fn test_policy_from_budget_config() {
        let policy = SummarizationPolicy::from(BudgetConfig {
            threshold: 42,
            max_summary_tokens: 7,
        });

        assert_eq!(policy.threshold(), 42);
        assert!(policy.summary_prompt(&History::new()).contains("less than 7 tokens"));
    }
}
