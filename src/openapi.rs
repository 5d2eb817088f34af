use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "BondiHub API",
        version = "1.0.0",
        description = "Backend API for BondiHub, a house rental marketplace for landlords and tenants",
        contact(
            name = "BondiHub Team",
            email = "support@bondihub.com"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    tags(
        (name = "auth", description = "Registration, login and profile"),
        (name = "houses", description = "House listings and images"),
        (name = "rentals", description = "Rental agreements"),
        (name = "payments", description = "Rent payments through mobile money, cash or bank"),
        (name = "reviews", description = "House reviews and ratings"),
        (name = "maintenance", description = "Maintenance requests"),
        (name = "favorites", description = "Tenant favorites"),
        (name = "notifications", description = "In-app notifications"),
        (name = "admin", description = "Dashboard, user management and reports")
    ),
    paths(
        crate::api::auth::register,
        crate::api::auth::login,
        crate::api::auth::logout,
        crate::api::auth::get_profile,
        crate::api::auth::update_profile,
        crate::api::auth::change_password,
        crate::api::houses::list_houses,
        crate::api::houses::get_house,
        crate::api::houses::create_house,
        crate::api::houses::update_house,
        crate::api::houses::delete_house,
        crate::api::houses::upload_image,
        crate::api::houses::delete_image,
        crate::api::reviews::house_reviews,
        crate::api::reviews::create_review,
        crate::api::reviews::my_reviews,
        crate::api::reviews::update_review,
        crate::api::reviews::delete_review,
        crate::api::rentals::create_agreement,
        crate::api::rentals::list_agreements,
        crate::api::rentals::get_agreement,
        crate::api::rentals::update_agreement,
        crate::api::rentals::terminate_agreement,
        crate::api::payments::process_payment,
        crate::api::payments::list_payments,
        crate::api::payments::get_payment,
        crate::api::payments::payment_stats,
        crate::api::maintenance::create_request,
        crate::api::maintenance::list_requests,
        crate::api::maintenance::get_request,
        crate::api::maintenance::update_request,
        crate::api::maintenance::maintenance_stats,
        crate::api::favorites::add_favorite,
        crate::api::favorites::remove_favorite,
        crate::api::favorites::list_favorites,
        crate::api::favorites::check_favorite,
        crate::api::notifications::list_notifications,
        crate::api::notifications::get_notification,
        crate::api::notifications::mark_read,
        crate::api::notifications::mark_all_read,
        crate::api::notifications::delete_notification,
        crate::api::notifications::notification_stats,
        crate::api::admin::dashboard,
        crate::api::admin::list_users,
        crate::api::admin::update_user_status,
        crate::api::admin::reports,
    ),
    components(
        schemas(
            crate::models::UserRole,
            crate::models::SubscriptionPlan,
            crate::models::UserPublic,
            crate::models::RegisterRequest,
            crate::models::LoginRequest,
            crate::models::AuthResponse,
            crate::models::UpdateProfileRequest,
            crate::models::ChangePasswordRequest,
            crate::models::UpdateUserStatusRequest,
            crate::models::HouseStatus,
            crate::models::HouseType,
            crate::models::House,
            crate::models::HouseImage,
            crate::models::HouseResponse,
            crate::models::HouseDetailResponse,
            crate::models::CreateHouseRequest,
            crate::models::UpdateHouseRequest,
            crate::models::AgreementStatus,
            crate::models::RentalAgreement,
            crate::models::RentalAgreementResponse,
            crate::models::CreateRentalRequest,
            crate::models::UpdateRentalRequest,
            crate::models::PaymentMethod,
            crate::models::PaymentStatus,
            crate::models::Payment,
            crate::models::CreatePaymentRequest,
            crate::models::PaymentStats,
            crate::services::payment::ChargeResult,
            crate::services::payment::PaymentOutcome,
            crate::models::Review,
            crate::models::ReviewResponse,
            crate::models::CreateReviewRequest,
            crate::models::UpdateReviewRequest,
            crate::models::RatingSummary,
            crate::models::MaintenanceStatus,
            crate::models::MaintenancePriority,
            crate::models::MaintenanceRequest,
            crate::models::MaintenanceRequestResponse,
            crate::models::CreateMaintenanceRequest,
            crate::models::UpdateMaintenanceRequest,
            crate::models::MaintenanceStats,
            crate::models::Favorite,
            crate::models::FavoriteResponse,
            crate::models::FavoriteCheck,
            crate::models::NotificationType,
            crate::models::Notification,
            crate::models::NotificationStats,
            crate::api::notifications::MarkAllReadResult,
            crate::models::RoleCount,
            crate::models::StatusCount,
            crate::models::TypeCount,
            crate::models::MethodBreakdown,
            crate::models::UserCounts,
            crate::models::HouseCounts,
            crate::models::AgreementCounts,
            crate::models::PaymentTotals,
            crate::models::MaintenanceCounts,
            crate::models::ReviewTotals,
            crate::models::DashboardStats,
            crate::models::ReportPeriod,
            crate::models::PaymentReportSummary,
            crate::models::PaymentReport,
            crate::models::HouseReportSummary,
            crate::models::HouseReport,
            crate::models::UserReportSummary,
            crate::models::UserReport,
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::Http::new(
                        utoipa::openapi::security::HttpAuthScheme::Bearer,
                    ),
                ),
            );
        }
    }
}
