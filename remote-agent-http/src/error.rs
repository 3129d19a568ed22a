//! Converts the shared `AgentError` taxonomy into a `poem::Error` carrying
//! the `{"detail": "..."}` body this agent's error contract mandates. `AgentError` already
//! implements `poem::error::ResponseError`; this just threads that response
//! through `poem::Error::from_response` for use at `?` sites in handlers.

use remote_agent_common::error::AgentError;

pub fn to_poem_error(e: AgentError) -> poem::Error {
    let response = poem::error::ResponseError::as_response(&e);
    poem::Error::from_response(response)
}
