//! Dashboard statistics
//!
//! Everything here is derived from the current collections on demand; no
//! statistic is stored on its own.

use crate::models::{Comparison, Conversation, Execution};
use crate::session::SessionStore;
use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;

/// Number of trailing days covered by the activity chart
pub const ACTIVITY_WINDOW_DAYS: usize = 7;

/// Usage count for one model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelUsage {
    /// Model identifier
    pub model: String,
    /// Executions of the model plus conversations using it
    pub count: usize,
}

/// Execution count for one calendar day (UTC)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayCount {
    /// Calendar day
    pub date: NaiveDate,
    /// Executions created that day
    pub count: usize,
}

/// Aggregate view over the session history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    /// Number of executions
    pub total_executions: usize,
    /// Number of conversations
    pub total_conversations: usize,
    /// Number of comparisons
    pub total_comparisons: usize,
    /// Execution tokens plus conversation tokens
    pub total_tokens_used: u64,
    /// Tokens used by executions alone
    pub execution_tokens_used: u64,
    /// Mean latency over executions and assistant messages; 0 when none
    pub average_latency_ms: f64,
    /// Usage per model, in first-encounter order
    pub model_usage: Vec<ModelUsage>,
    /// Highest usage count; `None` when nothing has been used
    pub most_used_model: Option<String>,
    /// Executions per day for the trailing window, oldest first
    pub executions_by_day: Vec<DayCount>,
}

impl DashboardStats {
    /// Compute statistics with the activity window ending on `today`
    ///
    /// # Arguments
    ///
    /// * `executions` - Execution collection
    /// * `conversations` - Conversation collection
    /// * `comparisons` - Comparison collection
    /// * `today` - Last (inclusive) day of the activity window
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use promptbench::stats::DashboardStats;
    ///
    /// let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
    /// let stats = DashboardStats::compute(&[], &[], &[], today);
    /// assert_eq!(stats.average_latency_ms, 0.0);
    /// assert_eq!(stats.most_used_model, None);
    /// assert_eq!(stats.executions_by_day.len(), 7);
    /// ```
    pub fn compute(
        executions: &[Execution],
        conversations: &[Conversation],
        comparisons: &[Comparison],
        today: NaiveDate,
    ) -> Self {
        let execution_tokens_used = executions.iter().map(|e| e.tokens.total).sum::<u64>();
        let total_tokens_used =
            execution_tokens_used + conversations.iter().map(|c| c.total_tokens).sum::<u64>();

        let latencies: Vec<u64> = executions
            .iter()
            .map(|e| e.latency_ms)
            .chain(
                conversations
                    .iter()
                    .flat_map(|c| c.messages.iter().filter_map(|m| m.latency_ms)),
            )
            .collect();
        let average_latency_ms = if latencies.is_empty() {
            0.0
        } else {
            latencies.iter().sum::<u64>() as f64 / latencies.len() as f64
        };

        let model_usage = count_models(
            executions
                .iter()
                .map(|e| e.model.as_str())
                .chain(conversations.iter().map(|c| c.model.as_str())),
        );

        // the earlier entry is kept on ties
        let most_used_model = model_usage
            .iter()
            .fold(None::<&ModelUsage>, |best, usage| match best {
                Some(b) if b.count >= usage.count => Some(b),
                _ => Some(usage),
            })
            .map(|usage| usage.model.clone());

        Self {
            total_executions: executions.len(),
            total_conversations: conversations.len(),
            total_comparisons: comparisons.len(),
            total_tokens_used,
            execution_tokens_used,
            average_latency_ms,
            model_usage,
            most_used_model,
            executions_by_day: executions_by_day(executions, today),
        }
    }

    /// Compute statistics for the store's current collections, today in UTC
    pub fn from_store(store: &SessionStore) -> Self {
        Self::compute(
            &store.executions(),
            &store.conversations(),
            &store.comparisons(),
            Utc::now().date_naive(),
        )
    }

    /// Share of total usage for a model, as a rounded percentage
    pub fn model_usage_percentage(&self, model: &str) -> u32 {
        let total: usize = self.model_usage.iter().map(|u| u.count).sum();
        if total == 0 {
            return 0;
        }
        let count = self
            .model_usage
            .iter()
            .find(|u| u.model == model)
            .map_or(0, |u| u.count);
        ((count as f64 / total as f64) * 100.0).round() as u32
    }

    /// Mean execution tokens, rounded; 0 with no executions
    pub fn average_tokens_per_execution(&self) -> u64 {
        if self.total_executions == 0 {
            return 0;
        }
        (self.execution_tokens_used as f64 / self.total_executions as f64).round() as u64
    }

    /// Day with the most executions in the window
    ///
    /// Returns `None` when the window has no executions. The most recent day
    /// wins ties.
    pub fn busiest_day(&self) -> Option<&DayCount> {
        self.executions_by_day
            .iter()
            .filter(|d| d.count > 0)
            .fold(None::<&DayCount>, |best, day| match best {
                Some(b) if b.count > day.count => Some(b),
                _ => Some(day),
            })
    }

    /// Display label for the most used model
    pub fn most_used_model_label(&self) -> &str {
        self.most_used_model.as_deref().unwrap_or("N/A")
    }
}

/// Count occurrences, keeping first-encounter order
fn count_models<'a>(models: impl Iterator<Item = &'a str>) -> Vec<ModelUsage> {
    let mut usage: Vec<ModelUsage> = Vec::new();
    for model in models {
        match usage.iter_mut().find(|u| u.model == model) {
            Some(entry) => entry.count += 1,
            None => usage.push(ModelUsage {
                model: model.to_string(),
                count: 1,
            }),
        }
    }
    usage
}

fn executions_by_day(executions: &[Execution], today: NaiveDate) -> Vec<DayCount> {
    (0..ACTIVITY_WINDOW_DAYS)
        .rev()
        .map(|offset| {
            let date = today - Duration::days(offset as i64);
            let count = executions
                .iter()
                .filter(|e| e.timestamp.date_naive() == date)
                .count();
            DayCount { date, count }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Message;
    use crate::test_utils::execution;
    use chrono::{TimeZone, Utc};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn at(d: u32, hour: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, d, hour, 0, 0).unwrap()
    }

    fn conversation(model: &str, latencies_and_tokens: &[(u64, u64)]) -> Conversation {
        let mut conv = Conversation::new(model, None);
        for (latency, tokens) in latencies_and_tokens {
            conv.push_message(Message::user("q"));
            conv.push_message(Message::assistant("a", model, Some(*tokens), *latency));
        }
        conv
    }

    #[test]
    fn test_empty_history() {
        let stats = DashboardStats::compute(&[], &[], &[], day(10));
        assert_eq!(stats.total_executions, 0);
        assert_eq!(stats.total_tokens_used, 0);
        assert_eq!(stats.average_latency_ms, 0.0);
        assert!(stats.model_usage.is_empty());
        assert_eq!(stats.most_used_model, None);
        assert_eq!(stats.most_used_model_label(), "N/A");
        assert!(stats.executions_by_day.iter().all(|d| d.count == 0));
        assert_eq!(stats.busiest_day(), None);
        assert_eq!(stats.average_tokens_per_execution(), 0);
        assert_eq!(stats.model_usage_percentage("gpt-4"), 0);
    }

    #[test]
    fn test_totals_and_latency() {
        let executions = vec![
            execution("gpt-4", at(10, 9), 100, 50),
            execution("gpt-4", at(9, 9), 300, 150),
        ];
        let conversations = vec![conversation("claude-3-opus", &[(200, 40), (400, 60)])];

        let stats = DashboardStats::compute(&executions, &conversations, &[], day(10));
        assert_eq!(stats.total_executions, 2);
        assert_eq!(stats.total_conversations, 1);
        assert_eq!(stats.total_tokens_used, 300);
        // (100 + 300 + 200 + 400) / 4
        assert_eq!(stats.average_latency_ms, 250.0);
    }

    #[test]
    fn test_conversation_counts_once_per_model() {
        let conversations = vec![conversation("mistral-7b", &[(10, 1), (10, 1), (10, 1)])];
        let stats = DashboardStats::compute(&[], &conversations, &[], day(10));
        assert_eq!(
            stats.model_usage,
            vec![ModelUsage {
                model: "mistral-7b".to_string(),
                count: 1
            }]
        );
        assert_eq!(stats.model_usage_percentage("mistral-7b"), 100);
    }

    #[test]
    fn test_most_used_model_first_wins_ties() {
        let executions = vec![
            execution("b", at(10, 1), 1, 1),
            execution("a", at(10, 2), 1, 1),
            execution("a", at(10, 3), 1, 1),
            execution("b", at(10, 4), 1, 1),
        ];
        let stats = DashboardStats::compute(&executions, &[], &[], day(10));
        assert_eq!(stats.most_used_model.as_deref(), Some("b"));

        let mut more = executions.clone();
        more.push(execution("a", at(10, 5), 1, 1));
        let stats = DashboardStats::compute(&more, &[], &[], day(10));
        assert_eq!(stats.most_used_model.as_deref(), Some("a"));
    }

    #[test]
    fn test_activity_window() {
        let executions = vec![
            execution("m", at(10, 23), 1, 1),
            execution("m", at(10, 0), 1, 1),
            execution("m", at(4, 12), 1, 1),
            // outside the window on both sides
            execution("m", at(3, 12), 1, 1),
            execution("m", at(11, 0), 1, 1),
        ];
        let stats = DashboardStats::compute(&executions, &[], &[], day(10));

        let dates: Vec<NaiveDate> = stats.executions_by_day.iter().map(|d| d.date).collect();
        assert_eq!(dates, (4..=10).map(day).collect::<Vec<_>>());
        let counts: Vec<usize> = stats.executions_by_day.iter().map(|d| d.count).collect();
        assert_eq!(counts, vec![1, 0, 0, 0, 0, 0, 2]);
        assert_eq!(stats.total_executions, 5);
    }

    #[test]
    fn test_busiest_day_latest_wins_ties() {
        let executions = vec![
            execution("m", at(6, 1), 1, 1),
            execution("m", at(8, 1), 1, 1),
            execution("m", at(9, 1), 1, 1),
            execution("m", at(5, 1), 1, 1),
            execution("m", at(5, 2), 1, 1),
        ];
        let stats = DashboardStats::compute(&executions, &[], &[], day(10));
        assert_eq!(stats.busiest_day().map(|d| d.date), Some(day(5)));

        let tied = DashboardStats::compute(&executions[..3], &[], &[], day(10));
        assert_eq!(tied.busiest_day().map(|d| d.date), Some(day(9)));
    }

    #[test]
    fn test_percentages_round() {
        let executions = vec![
            execution("a", at(10, 1), 1, 1),
            execution("b", at(10, 1), 1, 1),
            execution("b", at(10, 1), 1, 1),
        ];
        let stats = DashboardStats::compute(&executions, &[], &[], day(10));
        assert_eq!(stats.model_usage_percentage("a"), 33);
        assert_eq!(stats.model_usage_percentage("b"), 67);
        assert_eq!(stats.model_usage_percentage("zzz"), 0);
    }

    #[test]
    fn test_average_tokens_per_execution() {
        let executions = vec![
            execution("a", at(10, 1), 1, 10),
            execution("a", at(10, 1), 1, 15),
        ];
        let conversations = vec![conversation("a", &[(1, 1000)])];
        let stats = DashboardStats::compute(&executions, &conversations, &[], day(10));
        assert_eq!(stats.execution_tokens_used, 25);
        assert_eq!(stats.average_tokens_per_execution(), 13);
    }
}
