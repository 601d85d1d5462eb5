//! Model lifecycle hooks.

use crate::model::Model;

/// Receives lifecycle events for every model of the schema it is attached to.
///
/// The `*ing` hooks run before the statement and can cancel it by returning
/// `false`; [`Model::save`] and [`Model::delete`] then return `Ok(false)`
/// without touching the database. The `*ed` hooks run after a successful
/// statement.
pub trait Observer: Send + Sync {
    fn saving(&self, _model: &mut Model) -> bool {
        true
    }

    fn saved(&self, _model: &Model) {}

    fn creating(&self, _model: &mut Model) -> bool {
        true
    }

    fn created(&self, _model: &Model) {}

    fn updating(&self, _model: &mut Model) -> bool {
        true
    }

    fn updated(&self, _model: &Model) {}

    fn deleting(&self, _model: &Model) -> bool {
        true
    }

    fn deleted(&self, _model: &Model) {}
}
