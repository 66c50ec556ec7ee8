//! System prompt assembly.
//!
//! The prompt is the static persona followed by up to four optional blocks,
//! always in this order: conversation context, user profile, missing info,
//! newly learned.

use crate::persona::DEFAULT_INSTRUCTIONS;
use finguru_core::profile::{ProfileField, UserProfile};
use finguru_memory::ConversationHistory;
use std::fmt::Write;

/// Builds the per-turn system instruction.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    instructions: String,
}

impl PromptAssembler {
    pub fn new(instructions: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
        }
    }

    /// Use the configured override if present, the built-in persona otherwise.
    pub fn from_config(persona: &finguru_config::PersonaConfig) -> Self {
        match &persona.system_prompt_override {
            Some(custom) => Self::new(custom.clone()),
            None => Self::default(),
        }
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn assemble(
        &self,
        history: &ConversationHistory,
        profile: &UserProfile,
        newly_extracted: &[ProfileField],
    ) -> String {
        let mut prompt = self.instructions.clone();

        if !history.is_empty() {
            prompt.push_str("\n\nPREVIOUS CONVERSATION CONTEXT:");
            prompt.push_str("\n- Build on what was already discussed");
            prompt.push_str("\n- Don't repeat previous advice");
            prompt.push_str("\n- Reference earlier topics naturally");
        }

        if profile.has_any() {
            prompt.push_str("\n\nUSER PROFILE:");
            if let Some(age) = profile.age {
                let _ = write!(prompt, "\n- Age: {age}");
            }
            if let Some(income) = profile.income {
                let _ = write!(prompt, "\n- Income: {}", format_income(income));
            }
            if let Some(risk) = profile.risk_tolerance {
                let _ = write!(prompt, "\n- Risk Tolerance: {risk}");
            }
            if !profile.goals.is_empty() {
                let _ = write!(prompt, "\n- Goals: {}", join(&profile.goals));
            }
        }

        let missing = missing_fields(profile);
        if !missing.is_empty() {
            let _ = write!(prompt, "\n\nMISSING INFO: {}", missing.join(", "));
            prompt.push_str("\n- Naturally ask for missing info when relevant");
            prompt.push_str("\n- Don't ask all questions at once");
        }

        if !newly_extracted.is_empty() {
            let _ = write!(prompt, "\n\nNEWLY LEARNED: {}", join(newly_extracted));
            prompt.push_str("\n- Acknowledge new information provided");
            prompt.push_str("\n- Give specific advice based on new data");
        }

        prompt
    }
}

impl Default for PromptAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_INSTRUCTIONS)
    }
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Profile fields still unknown, in prompt order.
pub fn missing_fields(profile: &UserProfile) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if profile.age.is_none() {
        missing.push("age");
    }
    if profile.income.is_none() {
        missing.push("income");
    }
    if profile.risk_tolerance.is_none() {
        missing.push("risk tolerance");
    }
    if profile.goals.is_empty() {
        missing.push("financial goals");
    }
    missing
}

/// Render rupees in crore or lakh with one decimal, else grouped by thousands.
pub fn format_income(value: f64) -> String {
    if value >= 10_000_000.0 {
        format!("₹{:.1} crore", value / 10_000_000.0)
    } else if value >= 100_000.0 {
        format!("₹{:.1} lakh", value / 100_000.0)
    } else {
        format!("₹{}", group_thousands(&format!("{value:.0}")))
    }
}

fn group_thousands(digits: &str) -> String {
    let (sign, digits) = match digits.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", digits),
    };
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{sign}{grouped}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use finguru_core::profile::{GoalTag, RiskTolerance};

    fn assembler() -> PromptAssembler {
        PromptAssembler::new("PERSONA")
    }

    #[test]
    fn income_formatting() {
        assert_eq!(format_income(20_000_000.0), "₹2.0 crore");
        assert_eq!(format_income(15_000_000.0), "₹1.5 crore");
        assert_eq!(format_income(500_000.0), "₹5.0 lakh");
        assert_eq!(format_income(1_250_000.0), "₹12.5 lakh");
        assert_eq!(format_income(45_000.0), "₹45,000");
        assert_eq!(format_income(999.0), "₹999");
        assert_eq!(format_income(0.0), "₹0");
    }

    #[test]
    fn fresh_user_gets_only_missing_info() {
        let prompt =
            assembler().assemble(&ConversationHistory::default(), &UserProfile::new(), &[]);
        assert_eq!(
            prompt,
            "PERSONA\n\nMISSING INFO: age, income, risk tolerance, financial goals\
             \n- Naturally ask for missing info when relevant\
             \n- Don't ask all questions at once"
        );
    }

    #[test]
    fn complete_profile_has_no_missing_block() {
        let profile = UserProfile {
            age: Some(30),
            income: Some(1_200_000.0),
            risk_tolerance: Some(RiskTolerance::Moderate),
            goals: vec![GoalTag::Home, GoalTag::Retirement],
            info_collected: vec![],
        };
        let mut history = ConversationHistory::default();
        history.push_exchange("q", "a");

        let prompt = assembler().assemble(
            &history,
            &profile,
            &[ProfileField::Goal(GoalTag::Retirement)],
        );
        assert_eq!(
            prompt,
            "PERSONA\
             \n\nPREVIOUS CONVERSATION CONTEXT:\
             \n- Build on what was already discussed\
             \n- Don't repeat previous advice\
             \n- Reference earlier topics naturally\
             \n\nUSER PROFILE:\
             \n- Age: 30\
             \n- Income: ₹12.0 lakh\
             \n- Risk Tolerance: moderate\
             \n- Goals: home, retirement\
             \n\nNEWLY LEARNED: goal_retirement\
             \n- Acknowledge new information provided\
             \n- Give specific advice based on new data"
        );
    }

    #[test]
    fn partial_profile_lists_only_set_fields() {
        let profile = UserProfile {
            age: Some(45),
            ..UserProfile::new()
        };
        let prompt = assembler().assemble(
            &ConversationHistory::default(),
            &profile,
            &[ProfileField::Age],
        );
        assert!(prompt.contains("\n- Age: 45"));
        assert!(!prompt.contains("- Income:"));
        assert!(prompt.contains("MISSING INFO: income, risk tolerance, financial goals"));
        assert!(prompt.contains("NEWLY LEARNED: age"));
        assert!(!prompt.contains("PREVIOUS CONVERSATION CONTEXT"));
    }

    #[test]
    fn override_replaces_persona() {
        let persona = finguru_config::PersonaConfig {
            system_prompt_override: Some("Be brief.".into()),
        };
        assert_eq!(PromptAssembler::from_config(&persona).instructions(), "Be brief.");
        assert_eq!(
            PromptAssembler::from_config(&Default::default()).instructions(),
            DEFAULT_INSTRUCTIONS
        );
    }
}
