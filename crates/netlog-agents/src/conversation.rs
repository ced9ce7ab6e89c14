//! Conversation history of a finished run.

use serde::{Deserialize, Serialize};

use crate::agents::{AgentKind, AgentState};

/// One displayed message: `role` is `user`, an agent id or `assistant`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: String,
    pub content: String,
}

/// Builds and formats conversation history.
pub struct ConversationHistory;

impl ConversationHistory {
    /// User message plus every agent message, in order, with its author.
    pub fn from_state(state: &AgentState) -> Vec<HistoryEntry> {
        state
            .transcript
            .iter()
            .map(|e| HistoryEntry {
                role: e.speaker.role().to_string(),
                content: e.content.clone(),
            })
            .collect()
    }

    /// Attributes untagged agent text by explicit markers or characteristic
    /// phrases; `assistant` when nothing matches.
    pub fn identify_agent(content: &str) -> &'static str {
        const MARKERS: [(&str, AgentKind); 4] = [
            ("[SUPERVISOR]", AgentKind::Supervisor),
            ("[SQL_AGENT]", AgentKind::SqlAgent),
            ("[DATA_ANALYST]", AgentKind::Analyst),
            ("[REPORT_WRITER]", AgentKind::ReportWriter),
        ];
        const PHRASES: [(&str, AgentKind); 5] = [
            ("Handing over to the", AgentKind::Supervisor),
            ("Fetched data from the logs database", AgentKind::SqlAgent),
            ("Analysis finished.", AgentKind::Analyst),
            ("# 📊 Data Analysis Report", AgentKind::ReportWriter),
            ("# 📊 Raport Analizy Danych", AgentKind::ReportWriter),
        ];
        MARKERS
            .iter()
            .chain(PHRASES.iter())
            .find(|(needle, _)| content.contains(needle))
            .map(|(_, kind)| kind.id())
            .unwrap_or("assistant")
    }

    /// Entries for plain untagged text, attributed with [Self::identify_agent].
    pub fn from_untagged<'a>(messages: impl IntoIterator<Item = &'a str>) -> Vec<HistoryEntry> {
        messages
            .into_iter()
            .map(|m| HistoryEntry {
                role: Self::identify_agent(m).to_string(),
                content: m.to_string(),
            })
            .collect()
    }

    /// `[ROLE]: content` blocks separated by blank lines.
    pub fn format_for_display(history: &[HistoryEntry]) -> String {
        history
            .iter()
            .map(|e| format!("[{}]: {}", e.role.to_uppercase(), e.content))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_follows_transcript_tags() {
        let mut state = AgentState::new("Top apps?");
        state.record(AgentKind::Supervisor, "Handing over to the SQL Agent.");
        state.record(AgentKind::SqlAgent, "rows");
        let history = ConversationHistory::from_state(&state);
        let roles: Vec<&str> = history.iter().map(|e| e.role.as_str()).collect();
        assert_eq!(roles, vec!["user", "supervisor", "sql_agent"]);
        assert_eq!(
            ConversationHistory::format_for_display(&history[..2]),
            "[USER]: Top apps?\n\n[SUPERVISOR]: Handing over to the SQL Agent."
        );
    }

    #[test]
    fn identifies_untagged_text() {
        assert_eq!(ConversationHistory::identify_agent("[DATA_ANALYST] done"), "analyst");
        assert_eq!(
            ConversationHistory::identify_agent("Fetched data from the logs database (3 rows)"),
            "sql_agent"
        );
        assert_eq!(
            ConversationHistory::identify_agent("# 📊 Data Analysis Report\n..."),
            "report_writer"
        );
        assert_eq!(ConversationHistory::identify_agent("hello"), "assistant");
        let entries = ConversationHistory::from_untagged(["[SUPERVISOR] x", "y"]);
        assert_eq!(entries[0].role, "supervisor");
        assert_eq!(entries[1].role, "assistant");
    }
}
