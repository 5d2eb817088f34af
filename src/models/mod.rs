pub mod admin;
pub mod favorite;
pub mod house;
pub mod maintenance;
pub mod notification;
pub mod payment;
pub mod rental;
pub mod review;
pub mod user;

pub use admin::*;
pub use favorite::*;
pub use house::*;
pub use maintenance::*;
pub use notification::*;
pub use payment::*;
pub use rental::*;
pub use review::*;
pub use user::*;
