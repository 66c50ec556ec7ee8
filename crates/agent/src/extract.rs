//! Keyword-driven profile extraction from free text.
//!
//! Each detector is a pure function over the lower-cased input returning an
//! optional match. [`extract`] composes them in a fixed order and applies
//! only those whose field is still unset (goals are additive).

use finguru_core::profile::{GoalTag, MAX_AGE, MIN_AGE, ProfileField, RiskTolerance, UserProfile};

const AGE_ANCHORS: [&str; 4] = ["i am", "i'm", "age", "years old"];

const INCOME_ANCHORS: [&str; 8] = [
    "income", "earn", "salary", "make", "lakh", "lakhs", "crore", "crores",
];

const LAKH: f64 = 100_000.0;
const CRORE: f64 = 10_000_000.0;

/// Outcome of one extraction pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub profile: UserProfile,
    /// Fields set during this pass, in detection order.
    pub newly_extracted: Vec<ProfileField>,
}

/// Look for an age right after one of the age anchors.
///
/// Only the text between the first and second occurrence of an anchor is
/// considered, and only its first two tokens.
pub fn detect_age(lowercase: &str) -> Option<u8> {
    AGE_ANCHORS.into_iter().find_map(|anchor| {
        lowercase
            .split(anchor)
            .nth(1)?
            .split_whitespace()
            .take(2)
            .filter(|w| w.chars().all(|c| c.is_ascii_digit()))
            .filter_map(|w| w.parse::<u32>().ok())
            .find(|age| (MIN_AGE as u32..=MAX_AGE as u32).contains(age))
            .map(|age| age as u8)
    })
}

/// Digits and dots of a token, parsed as a number.
fn numeric_part(token: &str) -> Option<f64> {
    if !token.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    let digits: String = token
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    digits.parse().ok()
}

/// Look for an income figure around the income anchors, in rupees.
///
/// Every anchor present splits the input and all resulting tokens are scanned;
/// the last one that parses is the figure. The unit is decided by the whole
/// input: "lakh" anywhere wins, otherwise "crore" anywhere applies.
pub fn detect_income(lowercase: &str) -> Option<f64> {
    let multiplier = if lowercase.contains("lakh") {
        LAKH
    } else if lowercase.contains("crore") {
        CRORE
    } else {
        1.0
    };

    INCOME_ANCHORS
        .into_iter()
        .filter(|anchor| lowercase.contains(anchor))
        .flat_map(|anchor| lowercase.split(anchor))
        .flat_map(str::split_whitespace)
        .filter_map(numeric_part)
        .last()
        .map(|value| value * multiplier)
}

/// First risk level whose keywords appear in the input.
pub fn detect_risk(lowercase: &str) -> Option<RiskTolerance> {
    RiskTolerance::ALL
        .into_iter()
        .find(|level| level.keywords().iter().any(|k| lowercase.contains(k)))
}

/// Every goal whose keywords appear in the input, in vocabulary order.
pub fn detect_goals(lowercase: &str) -> Vec<GoalTag> {
    GoalTag::ALL
        .into_iter()
        .filter(|goal| goal.keywords().iter().any(|k| lowercase.contains(k)))
        .collect()
}

/// Run every detector against `input` and fold the results into a copy of `profile`.
pub fn extract(input: &str, profile: &UserProfile) -> Extraction {
    let lowercase = input.to_lowercase();
    let mut profile = profile.clone();
    let mut newly_extracted = Vec::new();

    if let (None, Some(age)) = (profile.age, detect_age(&lowercase)) {
        profile.age = Some(age);
        newly_extracted.push(ProfileField::Age);
    }

    if let (None, Some(income)) = (profile.income, detect_income(&lowercase)) {
        profile.income = Some(income);
        newly_extracted.push(ProfileField::Income);
    }

    if let (None, Some(risk)) = (profile.risk_tolerance, detect_risk(&lowercase)) {
        profile.risk_tolerance = Some(risk);
        newly_extracted.push(ProfileField::RiskTolerance);
    }

    for goal in detect_goals(&lowercase) {
        if profile.add_goal(goal) {
            newly_extracted.push(ProfileField::Goal(goal));
        }
    }

    profile.info_collected.extend(newly_extracted.iter().copied());

    Extraction {
        profile,
        newly_extracted,
    }
}
