use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate, Timelike};
use serde::{Deserialize, Serialize};

use super::domain::{AlertLevel, CriticalProtocol, Evaluation};

/// Clinical shift an evaluation falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shift {
    Day,
    Night,
}

impl Shift {
    pub const fn label(self) -> &'static str {
        match self {
            Shift::Day => "Diurno",
            Shift::Night => "Nocturno",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AlertCounts {
    pub green: usize,
    pub yellow: usize,
    pub orange: usize,
    pub red: usize,
}

impl AlertCounts {
    fn record(&mut self, level: AlertLevel) {
        match level {
            AlertLevel::Green => self.green += 1,
            AlertLevel::Yellow => self.yellow += 1,
            AlertLevel::Orange => self.orange += 1,
            AlertLevel::Red => self.red += 1,
        }
    }

    /// Green plus Yellow keys.
    pub fn containment(&self) -> usize {
        self.green + self.yellow
    }

    /// Orange plus Red keys.
    pub fn intervention(&self) -> usize {
        self.orange + self.red
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CriticalProtocolCounts {
    pub none: usize,
    pub yellow: usize,
    pub red: usize,
}

/// Mean criterion values over a group of evaluations.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CriteriaAverages {
    pub hospitalized_patients: f64,
    pub esi_c2_patients: f64,
    pub resuscitation_bay_patients: f64,
    pub waiting_72_hours_patients: f64,
    pub surge_patients: f64,
    pub total_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftSeries {
    pub reporting_day: NaiveDate,
    pub shift: Shift,
    pub evaluations: usize,
    pub highest_alert: AlertLevel,
    pub averages: CriteriaAverages,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProtocolStatistics {
    pub total_evaluations: usize,
    pub alert_counts: AlertCounts,
    pub containment_keys: usize,
    pub intervention_keys: usize,
    pub critical_protocol: CriticalProtocolCounts,
    pub surge_activations: usize,
    /// Mean surge patients over evaluations that recorded any; 0 when none did.
    pub average_surge_patients: f64,
    pub series: Vec<ShiftSeries>,
}

/// Aggregates history. The reporting day starts at the day-shift hour, so night
/// evaluations after midnight count toward the previous day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatisticsCalculator {
    day_shift_start_hour: u32,
    night_shift_start_hour: u32,
}

impl Default for StatisticsCalculator {
    fn default() -> Self {
        Self {
            day_shift_start_hour: 7,
            night_shift_start_hour: 19,
        }
    }
}

impl StatisticsCalculator {
    pub fn reporting_day(&self, timestamp: &DateTime<FixedOffset>) -> NaiveDate {
        let date = timestamp.date_naive();
        if timestamp.hour() >= self.day_shift_start_hour {
            date
        } else {
            date.pred_opt().unwrap_or(date)
        }
    }

    pub fn shift(&self, timestamp: &DateTime<FixedOffset>) -> Shift {
        let hour = timestamp.hour();
        if hour >= self.day_shift_start_hour && hour < self.night_shift_start_hour {
            Shift::Day
        } else {
            Shift::Night
        }
    }

    pub fn compute(&self, evaluations: &[Evaluation]) -> ProtocolStatistics {
        let mut alert_counts = AlertCounts::default();
        let mut critical_protocol = CriticalProtocolCounts::default();
        let mut surge_activations = 0usize;
        let mut surge_total = 0u64;
        let mut groups: BTreeMap<(NaiveDate, Shift), Vec<&Evaluation>> = BTreeMap::new();

        for evaluation in evaluations {
            alert_counts.record(evaluation.alert_level);
            match evaluation.snapshot.critical_patient_protocol {
                CriticalProtocol::None => critical_protocol.none += 1,
                CriticalProtocol::Yellow => critical_protocol.yellow += 1,
                CriticalProtocol::Red => critical_protocol.red += 1,
            }
            if evaluation.snapshot.surge_patients > 0 {
                surge_activations += 1;
                surge_total += u64::from(evaluation.snapshot.surge_patients);
            }
            let key = (
                self.reporting_day(&evaluation.timestamp),
                self.shift(&evaluation.timestamp),
            );
            groups.entry(key).or_default().push(evaluation);
        }

        let average_surge_patients = if surge_activations > 0 {
            surge_total as f64 / surge_activations as f64
        } else {
            0.0
        };

        let series = groups
            .into_iter()
            .map(|((reporting_day, shift), group)| ShiftSeries {
                reporting_day,
                shift,
                evaluations: group.len(),
                highest_alert: group
                    .iter()
                    .map(|evaluation| evaluation.alert_level)
                    .max()
                    .unwrap_or(AlertLevel::Green),
                averages: averages(&group),
            })
            .collect();

        ProtocolStatistics {
            total_evaluations: evaluations.len(),
            containment_keys: alert_counts.containment(),
            intervention_keys: alert_counts.intervention(),
            alert_counts,
            critical_protocol,
            surge_activations,
            average_surge_patients,
            series,
        }
    }
}

fn averages(group: &[&Evaluation]) -> CriteriaAverages {
    if group.is_empty() {
        return CriteriaAverages::default();
    }
    let count = group.len() as f64;
    let mean = |value: fn(&Evaluation) -> u32| {
        group
            .iter()
            .map(|evaluation| f64::from(value(evaluation)))
            .sum::<f64>()
            / count
    };

    CriteriaAverages {
        hospitalized_patients: mean(|e| e.snapshot.hospitalized_patients),
        esi_c2_patients: mean(|e| e.snapshot.esi_c2_patients),
        resuscitation_bay_patients: mean(|e| e.snapshot.resuscitation_bay_patients),
        waiting_72_hours_patients: mean(|e| e.snapshot.waiting_72_hours_patients),
        surge_patients: mean(|e| e.snapshot.surge_patients),
        total_score: mean(|e| e.score.total_score),
    }
}
