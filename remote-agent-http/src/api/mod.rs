use poem_openapi::OpenApi;

pub mod commands;
pub mod kill_switch;
pub mod pairing;
pub mod session;

pub fn get() -> impl OpenApi {
    (
        pairing::Api,
        session::Api,
        commands::Api,
        kill_switch::Api,
    )
}
