pub mod archive;
pub mod department;
pub mod employee;
pub mod leave_application;
pub mod leave_balance;
pub mod leave_report;
pub mod leave_request;
pub mod role;
pub mod user;

/// Lets a strum enum be read from a text column via `#[sqlx(try_from = "String")]`.
#[macro_export]
macro_rules! string_column {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl TryFrom<String> for $ty {
                type Error = strum::ParseError;

                fn try_from(value: String) -> Result<Self, Self::Error> {
                    value.parse()
                }
            }
        )+
    };
}
