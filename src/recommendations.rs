use crate::data::FeatureRecord;
use crate::model::RiskLevel;

pub const IMPROVE_ATTENDANCE: &str = "Improve class attendance rate";
pub const COMPLETE_ASSIGNMENTS: &str = "Focus on completing assignments on time";
pub const STUDY_MORE: &str = "Increase weekly study hours";
pub const PARTICIPATE: &str = "Participate more in class discussions";
pub const MEET_INSTRUCTOR: &str = "Schedule a meeting with your instructor";
pub const USE_TUTORING: &str = "Utilize tutoring services";
pub const MAINTAIN_HABITS: &str = "Maintain current study habits";

/// Advice for one student, in a fixed order. Missing fields never trigger a tip.
pub fn recommend(record: &FeatureRecord, risk_level: RiskLevel) -> Vec<String> {
    let mut recommendations = Vec::new();

    if record.attendance_rate.unwrap_or(1.0) < 0.8 {
        recommendations.push(IMPROVE_ATTENDANCE.to_string());
    }

    if record.assignment_avg.unwrap_or(100.0) < 70.0 {
        recommendations.push(COMPLETE_ASSIGNMENTS.to_string());
    }

    if record.study_hours.unwrap_or(20.0) < 10.0 {
        recommendations.push(STUDY_MORE.to_string());
    }

    if record.participation_score.unwrap_or(10.0) < 6.0 {
        recommendations.push(PARTICIPATE.to_string());
    }

    if risk_level == RiskLevel::High {
        recommendations.push(MEET_INSTRUCTOR.to_string());
        recommendations.push(USE_TUTORING.to_string());
    }

    if recommendations.is_empty() {
        recommendations.push(MAINTAIN_HABITS.to_string());
    }

    recommendations
}
