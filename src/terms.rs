//! Academic term parsing and ordering.
//!
//! A term is labeled `"2019-2020 Autumn"` and carries a numeric registrar
//! code (the "term id", e.g. `1202`) that planner buckets are keyed by.
//! Review recency comparisons use the fixed season order within the
//! academic year.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    Autumn,
    Winter,
    Spring,
    Summer,
}

impl Season {
    pub fn index(self) -> i32 {
        match self {
            Season::Autumn => 0,
            Season::Winter => 1,
            Season::Spring => 2,
            Season::Summer => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Season::Autumn => "Autumn",
            Season::Winter => "Winter",
            Season::Spring => "Spring",
            Season::Summer => "Summer",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "Autumn" => Some(Season::Autumn),
            "Winter" => Some(Season::Winter),
            "Spring" => Some(Season::Spring),
            "Summer" => Some(Season::Summer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcademicTerm {
    pub start_year: i32,
    pub season: Season,
}

impl AcademicTerm {
    /// Parse a label like `"2018-2019 Winter"`.
    pub fn parse(label: &str) -> Option<Self> {
        let (years, season) = label.split_once(' ')?;
        let (start, _) = years.split_once('-')?;
        Some(Self {
            start_year: start.parse().ok()?,
            season: Season::from_name(season.trim())?,
        })
    }

    /// Position in the global term ordering; later terms compare greater.
    pub fn ordinal(self) -> i32 {
        self.start_year * 4 + self.season.index()
    }

    /// Registrar term code, e.g. 1202 for 2019-2020 Autumn, 1204 for Winter.
    pub fn term_id(self) -> i32 {
        (self.start_year + 1 - 1900) * 10 + 2 + self.season.index() * 2
    }

    pub fn year_label(self) -> String {
        format!("{}-{}", self.start_year, self.start_year + 1)
    }

    pub fn label(self) -> String {
        format!("{} {}", self.year_label(), self.season.name())
    }
}

/// Ordering key for a raw term label. Labels that do not parse sort before
/// every real term, so malformed review data never counts as "most recent".
pub fn term_ordinal(label: &str) -> i32 {
    AcademicTerm::parse(label).map(|t| t.ordinal()).unwrap_or(0)
}
