use anyhow::bail;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ValueRef};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    Pending,
    Active,
    Completed,
}

impl TournamentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TournamentStatus::Pending => "pending",
            TournamentStatus::Active => "active",
            TournamentStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s {
            "pending" => Ok(TournamentStatus::Pending),
            "active" => Ok(TournamentStatus::Active),
            "completed" => Ok(TournamentStatus::Completed),
            other => bail!("Unknown tournament status: {}", other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentFormat {
    SingleElimination,
    DoubleElimination,
}

impl TournamentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            TournamentFormat::SingleElimination => "single_elimination",
            TournamentFormat::DoubleElimination => "double_elimination",
        }
    }

    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s {
            "single_elimination" => Ok(TournamentFormat::SingleElimination),
            "double_elimination" => Ok(TournamentFormat::DoubleElimination),
            other => bail!("Unknown tournament format: {}", other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }

    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            other => bail!("Unknown visibility: {}", other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LadderStatus {
    Active,
    Closed,
}

impl LadderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LadderStatus::Active => "active",
            LadderStatus::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s {
            "active" => Ok(LadderStatus::Active),
            "closed" => Ok(LadderStatus::Closed),
            other => bail!("Unknown ladder status: {}", other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Tournament,
    Ladder,
}

impl MatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchKind::Tournament => "tournament",
            MatchKind::Ladder => "ladder",
        }
    }

    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s {
            "tournament" => Ok(MatchKind::Tournament),
            "ladder" => Ok(MatchKind::Ladder),
            other => bail!("Unknown match kind: {}", other),
        }
    }

    /// The status a match of this kind must hold for result submission.
    /// Tournament matches are playable as soon as they are created; ladder
    /// matches first need the challenged party to accept.
    pub fn open_status(&self) -> MatchStatus {
        match self {
            MatchKind::Tournament => MatchStatus::Scheduled,
            MatchKind::Ladder => MatchStatus::Accepted,
        }
    }
}

/// Match lifecycle: scheduled -> accepted -> { completed | disputed }, with
/// terminal expired / declined / no_contest forced outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Scheduled,
    Accepted,
    Completed,
    Disputed,
    Expired,
    Declined,
    NoContest,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Scheduled => "scheduled",
            MatchStatus::Accepted => "accepted",
            MatchStatus::Completed => "completed",
            MatchStatus::Disputed => "disputed",
            MatchStatus::Expired => "expired",
            MatchStatus::Declined => "declined",
            MatchStatus::NoContest => "no_contest",
        }
    }

    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s {
            "scheduled" => Ok(MatchStatus::Scheduled),
            "accepted" => Ok(MatchStatus::Accepted),
            "completed" => Ok(MatchStatus::Completed),
            "disputed" => Ok(MatchStatus::Disputed),
            "expired" => Ok(MatchStatus::Expired),
            "declined" => Ok(MatchStatus::Declined),
            "no_contest" => Ok(MatchStatus::NoContest),
            other => bail!("Unknown match status: {}", other),
        }
    }

    /// Statuses the deadline sweeper is allowed to force out of.
    pub fn is_open(&self) -> bool {
        matches!(self, MatchStatus::Scheduled | MatchStatus::Accepted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    Consensus,
    AdminAccept,
    AdminCustom,
    NoContest,
}

impl ResolutionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionMethod::Consensus => "consensus",
            ResolutionMethod::AdminAccept => "admin_accept",
            ResolutionMethod::AdminCustom => "admin_custom",
            ResolutionMethod::NoContest => "no_contest",
        }
    }

    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s {
            "consensus" => Ok(ResolutionMethod::Consensus),
            "admin_accept" => Ok(ResolutionMethod::AdminAccept),
            "admin_custom" => Ok(ResolutionMethod::AdminCustom),
            "no_contest" => Ok(ResolutionMethod::NoContest),
            other => bail!("Unknown resolution method: {}", other),
        }
    }
}

fn text_column<T>(value: ValueRef<'_>, parse: fn(&str) -> anyhow::Result<T>) -> FromSqlResult<T> {
    parse(value.as_str()?).map_err(|e| FromSqlError::Other(e.into()))
}

impl FromSql for TournamentStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        text_column(value, Self::parse)
    }
}

impl FromSql for TournamentFormat {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        text_column(value, Self::parse)
    }
}

impl FromSql for Visibility {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        text_column(value, Self::parse)
    }
}

impl FromSql for LadderStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        text_column(value, Self::parse)
    }
}

impl FromSql for MatchKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        text_column(value, Self::parse)
    }
}

impl FromSql for MatchStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        text_column(value, Self::parse)
    }
}

impl FromSql for ResolutionMethod {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        text_column(value, Self::parse)
    }
}
