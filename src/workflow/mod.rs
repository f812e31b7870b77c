//! The workflow engine: every state-changing operation on an opinion
//! request lives here, behind a uniform transaction discipline (row lock,
//! state validation, version bump, same-transaction audit entry).

pub mod assignments;
pub mod communications;
pub mod documents;
pub mod opinions;
pub mod reference;
pub mod requests;
pub mod transitions;
