//! Canned analytical questions over `police_post_logs`.
//!
//! Each question is a [`QueryId`] with a static [`QueryDescriptor`]. Query
//! bodies read from a `stops` CTE produced by
//! [`crate::normalize::normalized_stops_sql`], so flag and key normalization
//! happens once rather than per query. Grouping and filter keys are guarded
//! with `IS NOT NULL`; ordering always ends in a key tie-break so reruns over
//! an unchanged table return identical rows.

use std::fmt::{Display, Formatter};

use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

use crate::gateway::{Gateway, GatewayError, Table};
use crate::normalize::normalized_stops_sql;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum QueryTier {
    Medium,
    Complex,
}

impl QueryTier {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Medium => "medium",
            Self::Complex => "complex",
        }
    }
}

impl Display for QueryTier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryShape {
    /// Plain `GROUP BY` / `ORDER BY` / `LIMIT`.
    SimpleAggregate,
    /// Aggregate plus a window function over the grouped rows.
    WindowedAggregate { window: WindowKind },
    /// Aggregate joined back against a derived per-group maximum.
    JoinedAggregate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    PartitionShare,
    Rank,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueryId {
    TopDrugStopVehicles,
    AgeGroupArrestRate,
    GenderShareByCountry,
    RaceGenderSearchRate,
    BusiestStopHour,
    AverageDurationByViolation,
    NightArrestRate,
    ViolationsWithSearchOrArrest,
    YoungDriverViolations,
    LeastArrestedViolation,
    CountryDrugStopRate,
    ArrestRateByCountryViolation,
    MostSearchedCountry,
    YearlyCountryArrests,
    AgeRaceViolationTrends,
    StopsByPeriod,
    HighSearchArrestViolations,
    DemographicsByCountry,
    TopArrestRateViolations,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueryDescriptor {
    pub id: QueryId,
    pub tier: QueryTier,
    pub label: &'static str,
    pub shape: QueryShape,

    /// Extra CTEs chained after `stops`, each as `name AS (...)`.
    #[serde(skip)]
    pub extra_ctes: &'static [&'static str],

    #[serde(skip)]
    pub body: &'static str,
}

impl QueryDescriptor {
    #[must_use]
    pub fn sql(&self) -> String {
        let mut ctes = vec![format!("stops AS ({})", normalized_stops_sql())];
        ctes.extend(self.extra_ctes.iter().map(|cte| cte.trim().to_string()));
        format!("WITH {}\n{}", ctes.join(",\n"), self.body.trim())
    }

    #[must_use]
    pub fn slug(&self) -> String {
        match serde_json::to_value(self.id) {
            Ok(Value::String(slug)) => slug,
            _ => format!("{:?}", self.id),
        }
    }

    #[must_use]
    pub fn describe(&self) -> Value {
        json!({
            "id": self.slug(),
            "tier": self.tier,
            "label": self.label,
            "shape": self.shape,
        })
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("no {tier} catalog query is labelled `{label}`")]
    UnknownLabel { tier: QueryTier, label: String },

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl CatalogError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownLabel { .. } => "unknown_label",
            Self::Gateway(error) => error.code(),
        }
    }
}

#[must_use]
pub fn descriptors() -> &'static [QueryDescriptor] {
    CATALOG
}

pub fn tier_descriptors(tier: QueryTier) -> impl Iterator<Item = &'static QueryDescriptor> {
    CATALOG.iter().filter(move |descriptor| descriptor.tier == tier)
}

/// Resolves a menu label (or the query's slug) within one tier. Matching
/// ignores ASCII case and surrounding whitespace.
pub fn find(tier: QueryTier, label: &str) -> Result<&'static QueryDescriptor, CatalogError> {
    let wanted = label.trim();
    tier_descriptors(tier)
        .find(|descriptor| {
            descriptor.label.eq_ignore_ascii_case(wanted)
                || descriptor.slug().eq_ignore_ascii_case(wanted)
        })
        .ok_or_else(|| CatalogError::UnknownLabel {
            tier,
            label: wanted.to_string(),
        })
}

pub fn run(gateway: &Gateway, tier: QueryTier, label: &str) -> Result<Table, CatalogError> {
    let descriptor = find(tier, label)?;
    log::info!(
        "catalog: running {} query `{}`",
        descriptor.tier,
        descriptor.slug()
    );
    Ok(gateway.execute_query(&descriptor.sql())?)
}

static CATALOG: &[QueryDescriptor] = &[
    QueryDescriptor {
        id: QueryId::TopDrugStopVehicles,
        tier: QueryTier::Medium,
        label: "Top 10 vehicle numbers involved in drug-related stops",
        shape: QueryShape::SimpleAggregate,
        extra_ctes: &[],
        body: r#"
SELECT vehicle_number, COUNT(*) AS drug_related_stops
FROM stops
WHERE drugs_related_stop = 1
  AND vehicle_number IS NOT NULL
GROUP BY vehicle_number
ORDER BY drug_related_stops DESC, vehicle_number ASC
LIMIT 10
"#,
    },
    QueryDescriptor {
        id: QueryId::AgeGroupArrestRate,
        tier: QueryTier::Medium,
        label: "Driver age group with highest arrest rate",
        shape: QueryShape::SimpleAggregate,
        extra_ctes: &[],
        body: r#"
SELECT
    CASE
        WHEN driver_age BETWEEN 18 AND 25 THEN '18-25'
        WHEN driver_age BETWEEN 26 AND 35 THEN '26-35'
        WHEN driver_age BETWEEN 36 AND 45 THEN '36-45'
        WHEN driver_age BETWEEN 46 AND 60 THEN '46-60'
        ELSE '60+'
    END AS age_group,
    COUNT(*) AS total_drivers,
    SUM(CASE WHEN is_arrested = 1 THEN 1 ELSE 0 END) AS total_arrests,
    ROUND(SUM(CASE WHEN is_arrested = 1 THEN 1 ELSE 0 END) * 100.0 / COUNT(*), 2) AS arrest_rate_percent
FROM stops
WHERE driver_age IS NOT NULL
GROUP BY age_group
ORDER BY arrest_rate_percent DESC, age_group ASC
LIMIT 1
"#,
    },
    QueryDescriptor {
        id: QueryId::GenderShareByCountry,
        tier: QueryTier::Medium,
        label: "Gender distribution of drivers stopped in each country",
        shape: QueryShape::WindowedAggregate {
            window: WindowKind::PartitionShare,
        },
        extra_ctes: &[],
        body: r#"
SELECT
    country_name,
    driver_gender,
    COUNT(*) AS total_gender,
    ROUND(100.0 * COUNT(*) / SUM(COUNT(*)) OVER (PARTITION BY country_name), 2) AS gender_percent
FROM stops
WHERE country_name IS NOT NULL
  AND driver_gender IS NOT NULL
GROUP BY country_name, driver_gender
ORDER BY country_name, driver_gender
"#,
    },
    QueryDescriptor {
        id: QueryId::RaceGenderSearchRate,
        tier: QueryTier::Medium,
        label: "Race and gender combination with highest search rate",
        shape: QueryShape::SimpleAggregate,
        extra_ctes: &[],
        body: r#"
SELECT
    driver_race,
    driver_gender,
    COUNT(*) AS total_stops,
    SUM(CASE WHEN search_conducted = 1 THEN 1 ELSE 0 END) AS total_searches,
    ROUND(SUM(CASE WHEN search_conducted = 1 THEN 1 ELSE 0 END) * 100.0 / COUNT(*), 2) AS search_percent_rate
FROM stops
WHERE driver_race IS NOT NULL
  AND driver_gender IS NOT NULL
GROUP BY driver_race, driver_gender
ORDER BY search_percent_rate DESC, driver_race ASC, driver_gender ASC
LIMIT 1
"#,
    },
    QueryDescriptor {
        id: QueryId::BusiestStopHour,
        tier: QueryTier::Medium,
        label: "Time of day with most traffic stops",
        shape: QueryShape::SimpleAggregate,
        extra_ctes: &[],
        body: r#"
SELECT stop_hour, COUNT(*) AS total_stops
FROM stops
WHERE stop_hour IS NOT NULL
GROUP BY stop_hour
ORDER BY total_stops DESC, stop_hour ASC
LIMIT 1
"#,
    },
    QueryDescriptor {
        id: QueryId::AverageDurationByViolation,
        tier: QueryTier::Medium,
        label: "Average stop duration for different violations",
        shape: QueryShape::SimpleAggregate,
        extra_ctes: &[],
        body: r#"
SELECT violation, AVG(CAST(stop_duration AS REAL)) AS average_stop_duration
FROM stops
WHERE stop_duration IS NOT NULL
  AND violation IS NOT NULL
GROUP BY violation
ORDER BY average_stop_duration DESC, violation ASC
"#,
    },
    QueryDescriptor {
        id: QueryId::NightArrestRate,
        tier: QueryTier::Medium,
        label: "Night stops more likely to lead to arrests",
        shape: QueryShape::SimpleAggregate,
        extra_ctes: &[],
        body: r#"
SELECT
    CASE
        WHEN stop_hour BETWEEN 20 AND 23 OR stop_hour BETWEEN 0 AND 5 THEN 'Night'
        ELSE 'Day'
    END AS time_of_day,
    COUNT(*) AS total_stops,
    SUM(CASE WHEN is_arrested = 1 THEN 1 ELSE 0 END) AS total_arrests,
    ROUND(SUM(CASE WHEN is_arrested = 1 THEN 1 ELSE 0 END) * 100.0 / COUNT(*), 2) AS arrest_rate_percent
FROM stops
WHERE stop_hour IS NOT NULL
GROUP BY time_of_day
ORDER BY arrest_rate_percent DESC, time_of_day ASC
"#,
    },
    QueryDescriptor {
        id: QueryId::ViolationsWithSearchOrArrest,
        tier: QueryTier::Medium,
        label: "Violations most associated with searches or arrests",
        shape: QueryShape::SimpleAggregate,
        extra_ctes: &[],
        body: r#"
SELECT
    violation,
    COUNT(*) AS total_stops,
    SUM(CASE WHEN is_arrested = 1 THEN 1 ELSE 0 END) AS total_arrests,
    SUM(CASE WHEN search_conducted = 1 THEN 1 ELSE 0 END) AS total_searches,
    SUM(CASE WHEN is_arrested = 1 OR search_conducted = 1 THEN 1 ELSE 0 END) AS search_or_arrest_total
FROM stops
WHERE violation IS NOT NULL
GROUP BY violation
ORDER BY search_or_arrest_total DESC, violation ASC
LIMIT 10
"#,
    },
    QueryDescriptor {
        id: QueryId::YoungDriverViolations,
        tier: QueryTier::Medium,
        label: "Most common violations for young drivers under 25",
        shape: QueryShape::SimpleAggregate,
        extra_ctes: &[],
        body: r#"
SELECT violation, COUNT(*) AS total_stops
FROM stops
WHERE driver_age < 25
  AND violation IS NOT NULL
GROUP BY violation
ORDER BY total_stops DESC, violation ASC
LIMIT 10
"#,
    },
    QueryDescriptor {
        id: QueryId::LeastArrestedViolation,
        tier: QueryTier::Medium,
        label: "Violation that rarely results in search or arrest",
        shape: QueryShape::SimpleAggregate,
        extra_ctes: &[],
        body: r#"
SELECT
    violation,
    COUNT(*) AS total_stops,
    SUM(CASE WHEN is_arrested = 1 THEN 1 ELSE 0 END) AS total_arrests
FROM stops
WHERE violation IS NOT NULL
GROUP BY violation
ORDER BY total_arrests ASC, violation ASC
LIMIT 1
"#,
    },
    QueryDescriptor {
        id: QueryId::CountryDrugStopRate,
        tier: QueryTier::Medium,
        label: "Countries with highest drug-related stop rates",
        shape: QueryShape::SimpleAggregate,
        extra_ctes: &[],
        body: r#"
SELECT
    country_name,
    COUNT(*) AS total_stops,
    SUM(CASE WHEN drugs_related_stop = 1 THEN 1 ELSE 0 END) AS drug_related_stops,
    ROUND(SUM(CASE WHEN drugs_related_stop = 1 THEN 1 ELSE 0 END) * 100.0 / COUNT(*), 2) AS drug_stop_rate_percent
FROM stops
WHERE country_name IS NOT NULL
GROUP BY country_name
ORDER BY drug_stop_rate_percent DESC, country_name ASC
"#,
    },
    QueryDescriptor {
        id: QueryId::ArrestRateByCountryViolation,
        tier: QueryTier::Medium,
        label: "Arrest rate by country and violation",
        shape: QueryShape::SimpleAggregate,
        extra_ctes: &[],
        body: r#"
SELECT
    country_name,
    COUNT(*) AS total_stops,
    violation,
    SUM(CASE WHEN is_arrested = 1 THEN 1 ELSE 0 END) AS total_arrests,
    ROUND(100.0 * SUM(CASE WHEN is_arrested = 1 THEN 1 ELSE 0 END) / COUNT(*), 2) AS total_arrest_percent
FROM stops
WHERE country_name IS NOT NULL
  AND violation IS NOT NULL
GROUP BY country_name, violation
ORDER BY country_name, violation
"#,
    },
    QueryDescriptor {
        id: QueryId::MostSearchedCountry,
        tier: QueryTier::Medium,
        label: "Country with the most stops with search conducted",
        shape: QueryShape::SimpleAggregate,
        extra_ctes: &[],
        body: r#"
SELECT country_name, COUNT(*) AS total_stops
FROM stops
WHERE search_conducted = 1
  AND country_name IS NOT NULL
GROUP BY country_name
ORDER BY total_stops DESC, country_name ASC
LIMIT 1
"#,
    },
    QueryDescriptor {
        id: QueryId::YearlyCountryArrests,
        tier: QueryTier::Complex,
        label: "Yearly breakdown of stops and arrests by country",
        shape: QueryShape::WindowedAggregate {
            window: WindowKind::Rank,
        },
        extra_ctes: &[],
        body: r#"
SELECT
    country_name,
    stop_year,
    COUNT(*) AS total_stops,
    SUM(CASE WHEN is_arrested = 1 THEN 1 ELSE 0 END) AS total_arrests,
    ROUND(SUM(CASE WHEN is_arrested = 1 THEN 1 ELSE 0 END) * 100.0 / COUNT(*), 2) AS arrest_rate_percent,
    RANK() OVER (
        PARTITION BY stop_year
        ORDER BY SUM(CASE WHEN is_arrested = 1 THEN 1 ELSE 0 END) DESC
    ) AS arrest_rank
FROM stops
WHERE country_name IS NOT NULL
  AND stop_year IS NOT NULL
GROUP BY country_name, stop_year
ORDER BY stop_year, arrest_rank, country_name
"#,
    },
    QueryDescriptor {
        id: QueryId::AgeRaceViolationTrends,
        tier: QueryTier::Complex,
        label: "Driver violation trends by age and race",
        shape: QueryShape::JoinedAggregate,
        extra_ctes: &[r#"
age_race_summary AS (
    SELECT driver_age, driver_race, violation, COUNT(*) AS violation_count
    FROM stops
    WHERE driver_age IS NOT NULL
      AND driver_race IS NOT NULL
      AND violation IS NOT NULL
    GROUP BY driver_age, driver_race, violation
)"#],
        body: r#"
SELECT ars.driver_age, ars.driver_race, ars.violation, ars.violation_count
FROM age_race_summary ars
JOIN (
    SELECT driver_age, driver_race, MAX(violation_count) AS max_count
    FROM age_race_summary
    GROUP BY driver_age, driver_race
) top_violations
  ON ars.driver_age = top_violations.driver_age
 AND ars.driver_race = top_violations.driver_race
 AND ars.violation_count = top_violations.max_count
ORDER BY ars.driver_race, ars.driver_age, ars.violation
"#,
    },
    QueryDescriptor {
        id: QueryId::StopsByPeriod,
        tier: QueryTier::Complex,
        label: "Time period analysis of stops by year, month, and hour of the day",
        shape: QueryShape::SimpleAggregate,
        extra_ctes: &[],
        body: r#"
SELECT stop_year AS year, stop_month AS month, stop_hour AS hour, COUNT(*) AS stop_count
FROM stops
WHERE stop_year IS NOT NULL
  AND stop_month IS NOT NULL
  AND stop_hour IS NOT NULL
GROUP BY stop_year, stop_month, stop_hour
ORDER BY stop_year, stop_month, stop_hour
"#,
    },
    QueryDescriptor {
        id: QueryId::HighSearchArrestViolations,
        tier: QueryTier::Complex,
        label: "Violations with high search and arrest rates",
        shape: QueryShape::WindowedAggregate {
            window: WindowKind::Rank,
        },
        extra_ctes: &[],
        body: r#"
SELECT
    violation,
    COUNT(*) AS total_stops,
    SUM(CASE WHEN search_conducted = 1 THEN 1 ELSE 0 END) AS total_searches,
    SUM(CASE WHEN is_arrested = 1 THEN 1 ELSE 0 END) AS total_arrests,
    ROUND(SUM(CASE WHEN search_conducted = 1 THEN 1 ELSE 0 END) * 100.0 / COUNT(*), 2) AS search_rate,
    ROUND(SUM(CASE WHEN is_arrested = 1 THEN 1 ELSE 0 END) * 100.0 / COUNT(*), 2) AS arrest_rate,
    RANK() OVER (ORDER BY SUM(CASE WHEN is_arrested = 1 THEN 1 ELSE 0 END) DESC) AS arrest_rank
FROM stops
WHERE violation IS NOT NULL
GROUP BY violation
ORDER BY arrest_rank, violation
LIMIT 10
"#,
    },
    QueryDescriptor {
        id: QueryId::DemographicsByCountry,
        tier: QueryTier::Complex,
        label: "Driver demographics by country (age, gender, and race)",
        shape: QueryShape::SimpleAggregate,
        extra_ctes: &[],
        body: r#"
SELECT
    country_name,
    AVG(driver_age) AS avg_age,
    driver_gender,
    driver_race,
    COUNT(*) AS stop_count
FROM stops
WHERE country_name IS NOT NULL
  AND driver_gender IS NOT NULL
  AND driver_race IS NOT NULL
GROUP BY country_name, driver_gender, driver_race
ORDER BY country_name, stop_count DESC, driver_gender, driver_race
"#,
    },
    QueryDescriptor {
        id: QueryId::TopArrestRateViolations,
        tier: QueryTier::Complex,
        label: "Top 5 violations with highest arrest rates",
        shape: QueryShape::SimpleAggregate,
        extra_ctes: &[],
        body: r#"
SELECT
    violation,
    COUNT(*) AS total_stops,
    SUM(CASE WHEN is_arrested = 1 THEN 1 ELSE 0 END) AS total_arrests,
    ROUND(SUM(CASE WHEN is_arrested = 1 THEN 1 ELSE 0 END) * 100.0 / COUNT(*), 2) AS arrest_rate_percent
FROM stops
WHERE violation IS NOT NULL
GROUP BY violation
ORDER BY arrest_rate_percent DESC, violation ASC
LIMIT 5
"#,
    },
];
