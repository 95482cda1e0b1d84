//! Versioned statutory deduction rules.
//!
//! Rates, brackets, and caps are supplied as configuration data, never
//! hard-coded at call sites, so historical runs can be recomputed with the
//! rules in effect at the time. Versions are selected by the run's start
//! date: the latest version whose `effective_from` is on or before the date
//! applies.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{PayrollError, PayrollResult};

/// One tier of the progressive tax schedule.
///
/// `upper` is the cumulative-income ceiling of the tier; the final tier is
/// open-ended (`None`). Rates are percentages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxBracket {
    pub upper: Option<Decimal>,
    pub rate: Decimal,
}

/// Percentage-of-gross pension with a ceiling on pensionable earnings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PensionRules {
    pub rate: Decimal,
    pub pensionable_cap: Decimal,
}

/// One version of the statutory rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatutoryRules {
    pub version: String,
    pub effective_from: NaiveDate,
    pub pension: PensionRules,
    pub tax_brackets: Vec<TaxBracket>,
    /// Flat percentage of gross, no cap.
    pub medical_levy_rate: Decimal,
}

/// All known rule versions, sorted by effective date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatutoryConfig {
    versions: Vec<StatutoryRules>,
}

static BUILTIN: Lazy<StatutoryConfig> = Lazy::new(|| {
    StatutoryConfig::new(vec![StatutoryRules {
        version: "builtin-2020".to_string(),
        effective_from: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        pension: PensionRules {
            rate: Decimal::from(5),
            pensionable_cap: Decimal::from(10_000),
        },
        tax_brackets: vec![
            TaxBracket {
                upper: Some(Decimal::from(1_000)),
                rate: Decimal::ZERO,
            },
            TaxBracket {
                upper: Some(Decimal::from(3_000)),
                rate: Decimal::from(10),
            },
            TaxBracket {
                upper: Some(Decimal::from(6_000)),
                rate: Decimal::from(20),
            },
            TaxBracket {
                upper: None,
                rate: Decimal::from(30),
            },
        ],
        medical_levy_rate: Decimal::from(2),
    }])
    .expect("builtin statutory rules are valid")
});

impl StatutoryConfig {
    /// Builds a config from rule versions, validating each.
    pub fn new(mut versions: Vec<StatutoryRules>) -> PayrollResult<Self> {
        if versions.is_empty() {
            return Err(PayrollError::Config {
                path: "<inline>".to_string(),
                message: "no rule versions supplied".to_string(),
            });
        }
        for rules in &versions {
            validate_rules(rules)?;
        }
        versions.sort_by_key(|r| r.effective_from);
        Ok(Self { versions })
    }

    /// Loads rule versions from a JSON file.
    pub async fn load(path: &str) -> PayrollResult<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| PayrollError::Config {
                path: path.to_string(),
                message: e.to_string(),
            })?;
        let versions: Vec<StatutoryRules> =
            serde_json::from_str(&raw).map_err(|e| PayrollError::Config {
                path: path.to_string(),
                message: e.to_string(),
            })?;
        Self::new(versions)
    }

    /// The built-in default rules, used when no rules file is configured.
    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    /// The rules in effect on the given date: the latest version at or
    /// before it.
    pub fn rules_for(&self, date: NaiveDate) -> PayrollResult<&StatutoryRules> {
        self.versions
            .iter()
            .rfind(|r| r.effective_from <= date)
            .ok_or_else(|| PayrollError::Config {
                path: "<loaded>".to_string(),
                message: format!("no statutory rules in effect on {date}"),
            })
    }
}

fn validate_rules(rules: &StatutoryRules) -> PayrollResult<()> {
    let reject = |message: String| {
        Err(PayrollError::Config {
            path: format!("version '{}'", rules.version),
            message,
        })
    };

    if rules.pension.rate < Decimal::ZERO || rules.pension.pensionable_cap < Decimal::ZERO {
        return reject("pension rate and cap must be non-negative".to_string());
    }
    if rules.medical_levy_rate < Decimal::ZERO {
        return reject("medical levy rate must be non-negative".to_string());
    }
    if rules.tax_brackets.is_empty() {
        return reject("tax schedule must have at least one bracket".to_string());
    }

    let mut prev_upper = Decimal::ZERO;
    for (i, bracket) in rules.tax_brackets.iter().enumerate() {
        if bracket.rate < Decimal::ZERO {
            return reject(format!("bracket {i} has a negative rate"));
        }
        let last = i == rules.tax_brackets.len() - 1;
        match bracket.upper {
            Some(upper) => {
                if last {
                    return reject("final tax bracket must be open-ended".to_string());
                }
                if i > 0 && upper <= prev_upper || upper <= Decimal::ZERO {
                    return reject(format!("bracket {i} upper bound must be ascending"));
                }
                prev_upper = upper;
            }
            None => {
                if !last {
                    return reject(format!("bracket {i} is open-ended but not last"));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn version(name: &str, from: NaiveDate, levy: Decimal) -> StatutoryRules {
        StatutoryRules {
            version: name.to_string(),
            effective_from: from,
            pension: PensionRules {
                rate: dec!(5),
                pensionable_cap: dec!(10000),
            },
            tax_brackets: vec![
                TaxBracket {
                    upper: Some(dec!(1000)),
                    rate: Decimal::ZERO,
                },
                TaxBracket {
                    upper: None,
                    rate: dec!(20),
                },
            ],
            medical_levy_rate: levy,
        }
    }

    #[test]
    fn selects_latest_version_at_or_before_date() {
        let config = StatutoryConfig::new(vec![
            version("v2", date(2024, 1, 1), dec!(3)),
            version("v1", date(2020, 1, 1), dec!(2)),
        ])
        .unwrap();

        assert_eq!(config.rules_for(date(2023, 6, 1)).unwrap().version, "v1");
        assert_eq!(config.rules_for(date(2024, 1, 1)).unwrap().version, "v2");
        assert_eq!(config.rules_for(date(2025, 1, 1)).unwrap().version, "v2");
    }

    #[test]
    fn rejects_dates_before_all_versions() {
        let config = StatutoryConfig::new(vec![version("v1", date(2020, 1, 1), dec!(2))]).unwrap();
        assert!(config.rules_for(date(2019, 12, 31)).is_err());
    }

    #[test]
    fn rejects_non_ascending_brackets() {
        let mut rules = version("bad", date(2020, 1, 1), dec!(2));
        rules.tax_brackets = vec![
            TaxBracket {
                upper: Some(dec!(3000)),
                rate: dec!(10),
            },
            TaxBracket {
                upper: Some(dec!(1000)),
                rate: dec!(20),
            },
            TaxBracket {
                upper: None,
                rate: dec!(30),
            },
        ];
        assert!(StatutoryConfig::new(vec![rules]).is_err());
    }

    #[test]
    fn rejects_closed_final_bracket() {
        let mut rules = version("bad", date(2020, 1, 1), dec!(2));
        rules.tax_brackets = vec![TaxBracket {
            upper: Some(dec!(1000)),
            rate: dec!(10),
        }];
        assert!(StatutoryConfig::new(vec![rules]).is_err());
    }

    #[test]
    fn rejects_open_bracket_in_the_middle() {
        let mut rules = version("bad", date(2020, 1, 1), dec!(2));
        rules.tax_brackets = vec![
            TaxBracket {
                upper: None,
                rate: dec!(10),
            },
            TaxBracket {
                upper: None,
                rate: dec!(20),
            },
        ];
        assert!(StatutoryConfig::new(vec![rules]).is_err());
    }

    #[test]
    fn builtin_rules_cover_recent_periods() {
        let config = StatutoryConfig::builtin();
        let rules = config.rules_for(date(2024, 5, 1)).unwrap();
        assert_eq!(rules.pension.rate, dec!(5));
        assert!(rules.tax_brackets.last().unwrap().upper.is_none());
    }

    #[test]
    fn versions_deserialize_from_json() {
        let raw = r#"[{
            "version": "2024-rates",
            "effective_from": "2024-01-01",
            "pension": {"rate": "5", "pensionable_cap": "10000"},
            "tax_brackets": [
                {"upper": "1000", "rate": "0"},
                {"upper": null, "rate": "15"}
            ],
            "medical_levy_rate": "2.5"
        }]"#;
        let versions: Vec<StatutoryRules> = serde_json::from_str(raw).unwrap();
        let config = StatutoryConfig::new(versions).unwrap();
        let rules = config.rules_for(date(2024, 5, 1)).unwrap();
        assert_eq!(rules.medical_levy_rate, dec!(2.5));
    }
}
