use crate::entity::Entity;
use crate::error::DataError;
use crate::page::{Page, Pageable};
use crate::record::Payload;
use std::future::Future;

/// Generic async repository for one entity type.
///
/// Uses RPITIT (return-position `impl Trait` in traits), no `async-trait` needed.
///
/// Methods take `&mut self` because a repository is bound to one session whose
/// open transaction it drives. Every mutating operation commits on success and
/// rolls back on failure; reads never commit.
pub trait Repository<T: Entity>: Send {
    /// Rows in storage order, skipping `skip` and returning at most `limit`.
    fn get_all(
        &mut self,
        skip: u64,
        limit: u64,
    ) -> impl Future<Output = Result<Vec<T>, DataError>> + Send;

    /// The row with the given identifier, or `None`.
    fn get_by_id(&mut self, id: &T::Id)
        -> impl Future<Output = Result<Option<T>, DataError>> + Send;

    /// Insert one row from the payload's set fields and return it as persisted.
    fn create<P: Payload + ?Sized>(
        &mut self,
        payload: &P,
    ) -> impl Future<Output = Result<T, DataError>> + Send;

    /// Insert all payloads in a single statement, returning rows in input order.
    fn create_many<P: Payload>(
        &mut self,
        payloads: &[P],
    ) -> impl Future<Output = Result<Vec<T>, DataError>> + Send;

    /// Apply the payload's set fields to the identified row.
    fn update<P: Payload + ?Sized>(
        &mut self,
        id: &T::Id,
        payload: &P,
    ) -> impl Future<Output = Result<T, DataError>> + Send;

    fn delete(&mut self, id: &T::Id) -> impl Future<Output = Result<(), DataError>> + Send;

    fn count(&mut self) -> impl Future<Output = Result<u64, DataError>> + Send;

    fn get_page(
        &mut self,
        pageable: &Pageable,
    ) -> impl Future<Output = Result<Page<T>, DataError>> + Send;
}
