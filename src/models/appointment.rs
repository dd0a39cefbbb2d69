use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::enums::{AppointmentStatus, SessionType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRef {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounselorRef {
    pub id: i64,
    pub name: String,
    pub specialization: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: Option<NaiveTime>,
    pub location: String,
}

impl TimeSlot {
    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.start)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentNote {
    pub title: String,
    pub body: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub student: StudentRef,
    pub counselor: CounselorRef,
    pub time: TimeSlot,
    pub session_type: SessionType,
    pub status: AppointmentStatus,
    pub notes: Vec<AppointmentNote>,
}

impl Appointment {
    /// A claim may be started once the session is marked completed or its
    /// scheduled start is strictly in the past.
    pub fn is_claimable(&self, now: NaiveDateTime) -> bool {
        self.status == AppointmentStatus::Completed || self.time.starts_at() < now
    }
}
