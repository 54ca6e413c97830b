use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

use crate::api::{
    PageQuery,
    dashboard::{DashboardStats, DepartmentHeadcount},
    dean::{DeanDashboard, DeanProfile},
    department::CreateDepartment,
    employee::{CreateEmployee, EmployeeListResponse},
    kiosk::{KioskEmployee, VerifyEmployee},
    leave_request::{ReviewBody, ReviewOutcome},
    position::CreatePosition,
    user::RotateAccessKey,
};
use crate::auth::handlers::{AccessKeyRequest, KioskToken, LoginRequest, TokenPair};
use crate::model::{
    archive::{ArchiveBatchSummary, FinalStatus, LeaveArchive},
    department::{Department, Position},
    employee::Employee,
    leave_application::{
        ApplicationStatus, LeaveApplication, LeaveType, NewLeaveApplication, SickLocation,
        VacationLocation,
    },
    leave_balance::LeaveBalance,
    leave_report::{LeaveReport, LeaveTypeCount, ReviewStatus},
    leave_request::{LeaveRequest, LeaveRequestView, RequestStatus},
    role::Role,
    user::Dean,
};
use crate::service::{
    account::{NewDean, NewUser},
    leave::FiledLeave,
    report::ReportStatistics,
};

/// Registers the staff bearer token and the kiosk token schemes.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        let bearer = || {
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            )
        };
        components.add_security_scheme("bearer_auth", bearer());
        components.add_security_scheme("kiosk_token", bearer());
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Leave Records API",
        version = "1.0.0",
        description = r#"
## Faculty Leave Records

Employees file leave at a kiosk. The dean of the employee's department reviews it first,
then HR gives the final decision. Days are deducted when the leave is filed and returned
(capped at 15 per year) when it is denied.

### Security
- **Staff** (HR and deans) log in at `/auth/login` and send `Authorization: Bearer <access_token>`.
- **Kiosk** clients exchange the access key at `/auth/verify-key` for a short-lived kiosk token.

### Response Format
`{"success": true, "message": ..., "data": ...}` on success and
`{"success": false, "message": ...}` on failure. List endpoints add `page`, `per_page` and `total`.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::auth::handlers::verify_key,

        crate::api::kiosk::verify_employee,
        crate::api::kiosk::submit_leave_application,

        crate::api::department::list_departments,
        crate::api::department::create_department,
        crate::api::department::get_department,
        crate::api::department::update_department,
        crate::api::department::delete_department,
        crate::api::department::department_employees,

        crate::api::position::list_positions,
        crate::api::position::create_position,
        crate::api::position::get_position,
        crate::api::position::update_position,
        crate::api::position::delete_position,
        crate::api::position::position_employees,

        crate::api::employee::create_employee,
        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,
        crate::api::employee::activate_employee,
        crate::api::employee::leave_history,

        crate::api::user::create_user,
        crate::api::user::rotate_access_key,

        crate::api::dean::create_dean,
        crate::api::dean::me,
        crate::api::dean::dashboard,

        crate::api::leave_request::list_leave_requests,
        crate::api::leave_request::pending_leave_requests,
        crate::api::leave_request::get_leave_request,
        crate::api::leave_request::delete_leave_request,
        crate::api::leave_request::dean_approve,
        crate::api::leave_request::dean_deny,
        crate::api::leave_request::hr_approve,
        crate::api::leave_request::hr_deny,
        crate::api::leave_request::archive_leave_request,

        crate::api::leave_report::list_leave_reports,
        crate::api::leave_report::recent_leave_reports,
        crate::api::leave_report::leave_report_statistics,
        crate::api::leave_report::get_leave_report,

        crate::api::archive::list_archives,
        crate::api::archive::archive_all,
        crate::api::archive::get_archive,
        crate::api::archive::delete_archive,
        crate::api::archive::archive_pdf,

        crate::api::dashboard::dashboard_stats
    ),
    components(
        schemas(
            LoginRequest,
            TokenPair,
            AccessKeyRequest,
            KioskToken,
            Role,
            VerifyEmployee,
            KioskEmployee,
            NewLeaveApplication,
            LeaveType,
            VacationLocation,
            SickLocation,
            ApplicationStatus,
            LeaveApplication,
            LeaveBalance,
            FiledLeave,
            Department,
            CreateDepartment,
            Position,
            CreatePosition,
            Employee,
            CreateEmployee,
            EmployeeListResponse,
            NewUser,
            RotateAccessKey,
            NewDean,
            Dean,
            DeanProfile,
            DeanDashboard,
            RequestStatus,
            LeaveRequest,
            LeaveRequestView,
            ReviewBody,
            ReviewOutcome,
            ReviewStatus,
            LeaveReport,
            LeaveTypeCount,
            ReportStatistics,
            FinalStatus,
            LeaveArchive,
            ArchiveBatchSummary,
            DepartmentHeadcount,
            DashboardStats,
            PageQuery
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Staff login and kiosk key exchange"),
        (name = "Kiosk", description = "Employee lookup and leave filing"),
        (name = "Department", description = "Department management APIs"),
        (name = "Position", description = "Position management APIs"),
        (name = "Employee", description = "Employee management APIs"),
        (name = "User", description = "HR accounts and kiosk key"),
        (name = "Dean", description = "Dean accounts and dashboard"),
        (name = "Leave Request", description = "Dean and HR review workflow"),
        (name = "Leave Report", description = "Review reports"),
        (name = "Archive", description = "Archived decisions and PDF export"),
        (name = "Dashboard", description = "HR counters"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_workflow_paths_and_security() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/leave-requests/{request_id}/hr-deny"));
        assert!(doc.paths.paths.contains_key("/kiosk/leave-applications"));

        let schemes = doc.components.unwrap().security_schemes;
        assert!(schemes.contains_key("bearer_auth"));
        assert!(schemes.contains_key("kiosk_token"));
    }
}
