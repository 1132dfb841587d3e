mod auth;
mod health_check;
mod records;
mod users;

pub use auth::{login, refresh, session_info, AuthResponse, LoginRequest, RefreshRequest};
pub use health_check::health_check;
pub use records::{create_record, delete_record, get_record, list_user_records, update_record};
pub use users::{delete_user, get_current_user, get_user, register, update_user};
