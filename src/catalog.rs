//! Appointment Catalog: read-only directory of appointments.
//!
//! The app ships its appointment directory as bundled mock data; this
//! module exposes it by id and answers which appointments may start a claim.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;

use crate::models::{
    Appointment, AppointmentNote, AppointmentStatus, CounselorRef, SessionType, StudentRef,
    TimeSlot,
};

/// Read-only appointment lookup.
pub trait AppointmentCatalog: Send + Sync {
    fn get(&self, appointment_id: i64) -> Option<Appointment>;

    /// All appointments, in directory order.
    fn list(&self) -> Vec<Appointment>;
}

/// Appointments a counselor may pick on the "select appointment" step.
pub fn selectable_appointments(
    catalog: &dyn AppointmentCatalog,
    now: NaiveDateTime,
) -> Vec<Appointment> {
    catalog
        .list()
        .into_iter()
        .filter(|a| a.is_claimable(now))
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Malformed appointment data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Appointment {id}: unknown status '{status}'")]
    UnknownStatus { id: i64, status: String },

    #[error("Duplicate appointment id {0}")]
    DuplicateId(i64),
}

/// In-memory catalog.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    appointments: Vec<Appointment>,
}

/// Shape of bundled appointment records, where `status` is whatever
/// spelling the originating screen used.
#[derive(Debug, Deserialize)]
struct RawAppointment {
    id: i64,
    student: StudentRef,
    counselor: CounselorRef,
    time: TimeSlot,
    session_type: SessionType,
    status: String,
    #[serde(default)]
    notes: Vec<AppointmentNote>,
}

impl StaticCatalog {
    pub fn new(appointments: Vec<Appointment>) -> Self {
        Self { appointments }
    }

    /// Parse bundled JSON records, normalizing status spellings.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let raw: Vec<RawAppointment> = serde_json::from_str(json)?;
        let mut appointments: Vec<Appointment> = Vec::with_capacity(raw.len());
        for r in raw {
            if appointments.iter().any(|a| a.id == r.id) {
                return Err(CatalogError::DuplicateId(r.id));
            }
            let status = AppointmentStatus::normalize(&r.status).ok_or_else(|| {
                CatalogError::UnknownStatus { id: r.id, status: r.status.clone() }
            })?;
            appointments.push(Appointment {
                id: r.id,
                student: r.student,
                counselor: r.counselor,
                time: r.time,
                session_type: r.session_type,
                status,
                notes: r.notes,
            });
        }
        tracing::debug!(count = appointments.len(), "Appointment catalog loaded");
        Ok(Self { appointments })
    }

    /// The demo directory bundled with the app.
    pub fn seeded() -> Self {
        let counselor = |id: i64, name: &str, specialization: &str| CounselorRef {
            id,
            name: name.to_string(),
            specialization: specialization.to_string(),
        };
        let ellis = counselor(1, "Dr. Maya Ellis", "Adolescent Counseling");
        let okafor = counselor(2, "James Okafor, LCSW", "Family Therapy");

        let entries: Vec<(i64, i64, &str, &CounselorRef, (i32, u32, u32), (u32, u32), SessionType, AppointmentStatus)> = vec![
            (1, 101, "Ava Reyes", &ellis, (2024, 9, 16), (9, 0), SessionType::Individual, AppointmentStatus::Completed),
            (2, 102, "Liam Chen", &okafor, (2024, 9, 18), (13, 30), SessionType::Family, AppointmentStatus::Completed),
            (3, 103, "Noah Patel", &ellis, (2024, 9, 23), (10, 15), SessionType::CheckIn, AppointmentStatus::Missed),
            (4, 104, "Emma Johnson", &okafor, (2024, 10, 1), (11, 0), SessionType::Group, AppointmentStatus::Pending),
            (5, 105, "Olivia Brooks", &ellis, (2024, 10, 3), (14, 0), SessionType::Crisis, AppointmentStatus::Completed),
            (6, 106, "Mason Rivera", &okafor, (2024, 10, 8), (8, 45), SessionType::Consultation, AppointmentStatus::Completed),
            (7, 107, "Samuel Green", &ellis, (2024, 10, 10), (10, 0), SessionType::Individual, AppointmentStatus::Completed),
            (8, 108, "Sophia Kim", &ellis, (2099, 5, 20), (9, 30), SessionType::Individual, AppointmentStatus::Pending),
            (9, 109, "Lucas Wright", &okafor, (2099, 6, 2), (15, 0), SessionType::Family, AppointmentStatus::Missed),
        ];

        let appointments = entries
            .into_iter()
            .filter_map(|(id, student_id, student, counselor, (y, m, d), (h, min), session_type, status)| {
                let date = NaiveDate::from_ymd_opt(y, m, d)?;
                let start = NaiveTime::from_hms_opt(h, min, 0)?;
                Some(Appointment {
                    id,
                    student: StudentRef { id: student_id, name: student.to_string() },
                    counselor: counselor.clone(),
                    time: TimeSlot {
                        date,
                        start,
                        end: Some(start + chrono::Duration::minutes(45)),
                        location: "Counseling Office B".to_string(),
                    },
                    session_type,
                    status,
                    notes: vec![AppointmentNote {
                        title: "Session summary".to_string(),
                        body: format!("{} session with {student}.", session_type.as_str()),
                        date,
                    }],
                })
            })
            .collect();

        Self { appointments }
    }
}

impl AppointmentCatalog for StaticCatalog {
    fn get(&self, appointment_id: i64) -> Option<Appointment> {
        self.appointments.iter().find(|a| a.id == appointment_id).cloned()
    }

    fn list(&self) -> Vec<Appointment> {
        self.appointments.clone()
    }
}
