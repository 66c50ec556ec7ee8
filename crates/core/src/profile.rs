//! The financial profile learned about a user over a conversation.
//!
//! Scalar fields are first-write-wins: once `age`, `income` or
//! `risk_tolerance` holds a value, nothing overwrites it. `goals` only grows,
//! and `info_collected` is an append-only audit trail.

use serde::{Deserialize, Serialize, Serializer};

/// Lowest accepted age.
pub const MIN_AGE: u8 = 5;
/// Highest accepted age.
pub const MAX_AGE: u8 = 120;

/// How much investment risk the user is comfortable with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTolerance {
    Conservative,
    Moderate,
    Aggressive,
}

impl RiskTolerance {
    /// All levels, in detection order.
    pub const ALL: [RiskTolerance; 3] = [
        RiskTolerance::Conservative,
        RiskTolerance::Moderate,
        RiskTolerance::Aggressive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTolerance::Conservative => "conservative",
            RiskTolerance::Moderate => "moderate",
            RiskTolerance::Aggressive => "aggressive",
        }
    }

    /// Phrases that signal this level.
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            RiskTolerance::Conservative => &["conservative", "safe", "low risk", "careful"],
            RiskTolerance::Moderate => &["moderate", "balanced", "medium risk"],
            RiskTolerance::Aggressive => &["aggressive", "high risk", "risky"],
        }
    }
}

impl std::fmt::Display for RiskTolerance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A financial objective from the fixed goal vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalTag {
    Retirement,
    Education,
    Home,
    EmergencyFund,
    WealthGrowth,
    TaxSaving,
    Marriage,
    Children,
}

impl GoalTag {
    /// All goals, in detection order.
    pub const ALL: [GoalTag; 8] = [
        GoalTag::Retirement,
        GoalTag::Education,
        GoalTag::Home,
        GoalTag::EmergencyFund,
        GoalTag::WealthGrowth,
        GoalTag::TaxSaving,
        GoalTag::Marriage,
        GoalTag::Children,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GoalTag::Retirement => "retirement",
            GoalTag::Education => "education",
            GoalTag::Home => "home",
            GoalTag::EmergencyFund => "emergency_fund",
            GoalTag::WealthGrowth => "wealth_growth",
            GoalTag::TaxSaving => "tax_saving",
            GoalTag::Marriage => "marriage",
            GoalTag::Children => "children",
        }
    }

    /// Phrases that signal this goal.
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            GoalTag::Retirement => &["retirement", "retire"],
            GoalTag::Education => &["education", "college", "university", "school fees"],
            GoalTag::Home => &["home", "house", "property", "flat"],
            GoalTag::EmergencyFund => &["emergency", "rainy day"],
            GoalTag::WealthGrowth => &["wealth", "grow money"],
            GoalTag::TaxSaving => &["tax saving", "80c", "tax benefit"],
            GoalTag::Marriage => &["marriage", "wedding", "shaadi"],
            GoalTag::Children => &["children", "child", "kids"],
        }
    }
}

impl std::fmt::Display for GoalTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies a profile field that was learned during a turn.
///
/// Serialized as its identifier string (`age`, `income`, `risk_tolerance`,
/// `goal_<tag>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileField {
    Age,
    Income,
    RiskTolerance,
    Goal(GoalTag),
}

impl std::fmt::Display for ProfileField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProfileField::Age => f.write_str("age"),
            ProfileField::Income => f.write_str("income"),
            ProfileField::RiskTolerance => f.write_str("risk_tolerance"),
            ProfileField::Goal(goal) => write!(f, "goal_{goal}"),
        }
    }
}

impl Serialize for ProfileField {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Everything learned about one user.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserProfile {
    pub age: Option<u8>,

    /// Annual income in rupees.
    pub income: Option<f64>,

    pub risk_tolerance: Option<RiskTolerance>,

    pub goals: Vec<GoalTag>,

    /// Every field identifier ever learned, in order, duplicates kept.
    pub info_collected: Vec<ProfileField>,
}

impl UserProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any field has been learned.
    pub fn has_any(&self) -> bool {
        self.age.is_some()
            || self.income.is_some()
            || self.risk_tolerance.is_some()
            || !self.goals.is_empty()
    }

    /// Add a goal unless already present. Returns whether it was added.
    pub fn add_goal(&mut self, goal: GoalTag) -> bool {
        if self.goals.contains(&goal) {
            return false;
        }
        self.goals.push(goal);
        true
    }
}
