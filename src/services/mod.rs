pub mod auth_service;
pub mod image_service;
pub mod outbox;
pub mod password;
pub mod payment;

pub use auth_service::{AuthService, Claims, TokenError};
pub use image_service::ImageService;
pub use outbox::{LogSink, NotificationDispatcher, NotificationSink, Outbox};
pub use payment::{PaymentOrchestrator, ProviderRegistry};
