use super::super::domain::ValidatedSnapshot;
use super::config::ScoringTables;
use super::{Criterion, ScoreBreakdown, ScoreComponent};

pub(crate) fn score_snapshot(snapshot: &ValidatedSnapshot, tables: &ScoringTables) -> ScoreBreakdown {
    let resuscitation_count = snapshot.resuscitation_load();
    let resuscitation_notes = if snapshot.surge_active {
        format!(
            "surge active: {resuscitation_count} patients in resuscitation bay and supernumerary"
        )
    } else {
        format!("{resuscitation_count} patients in resuscitation bay")
    };

    let components = vec![
        ScoreComponent {
            criterion: Criterion::HospitalizedPatients,
            count: snapshot.hospitalized_patients,
            points: tables
                .hospitalized_patients
                .points_for(snapshot.hospitalized_patients),
            notes: format!(
                "{} hospitalized patients awaiting a bed",
                snapshot.hospitalized_patients
            ),
        },
        ScoreComponent {
            criterion: Criterion::EsiC2Patients,
            count: snapshot.esi_c2_patients,
            points: tables.esi_c2_patients.points_for(snapshot.esi_c2_patients),
            notes: format!(
                "{} ESI C2 patients in care or waiting",
                snapshot.esi_c2_patients
            ),
        },
        ScoreComponent {
            criterion: Criterion::ResuscitationBay,
            count: resuscitation_count,
            points: tables
                .resuscitation(snapshot.scenario)
                .points_for(resuscitation_count),
            notes: resuscitation_notes,
        },
        ScoreComponent {
            criterion: Criterion::Waiting72Hours,
            count: snapshot.waiting_72_hours_patients,
            points: tables
                .waiting_72_hours_patients
                .points_for(snapshot.waiting_72_hours_patients),
            notes: format!(
                "{} patients waiting 72+ hours for a hospital bed",
                snapshot.waiting_72_hours_patients
            ),
        },
        ScoreComponent {
            criterion: Criterion::CriticalPatientProtocol,
            count: u32::from(snapshot.critical_patient_protocol.is_active()),
            points: tables
                .critical_patient_protocol
                .points_for(snapshot.critical_patient_protocol),
            notes: format!(
                "critical patient protocol: {}",
                snapshot.critical_patient_protocol.label()
            ),
        },
    ];

    let total_score = components
        .iter()
        .fold(0u32, |total, component| total.saturating_add(component.points));

    ScoreBreakdown {
        components,
        total_score,
    }
}
