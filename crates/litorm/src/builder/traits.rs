//! Trait shared by all statement builders.

use crate::builder::BuiltStatement;
use crate::error::{OrmError, OrmResult};
use crate::gateway::{ExecResult, FromRowStream, Gateway, RowStream};
use crate::row::FromRow;

/// Base trait for all statement builders.
///
/// `build()` does the work; the provided async methods hand the result to a
/// [`Gateway`]. The statement is built before the returned future is created,
/// so the future never borrows the builder.
pub trait StatementBuilder {
    /// Build the SQL string and parameter list.
    fn build(&self) -> OrmResult<BuiltStatement>;

    /// Debug helper to get the SQL string.
    fn to_sql(&self) -> OrmResult<String> {
        self.build().map(BuiltStatement::into_sql)
    }

    /// Execute a mutating statement.
    fn execute<G: Gateway>(
        &self,
        gateway: &G,
    ) -> impl std::future::Future<Output = OrmResult<ExecResult>> + Send {
        let built = self.build();
        async move { gateway.execute(built?).await }
    }

    /// Execute and return a lazily consumed row stream.
    fn stream<G: Gateway>(
        &self,
        gateway: &G,
    ) -> impl std::future::Future<Output = OrmResult<RowStream>> + Send {
        let built = self.build();
        async move { gateway.query(built?).await }
    }

    /// Execute and map rows to `T` as they arrive.
    fn stream_as<T: FromRow, G: Gateway>(
        &self,
        gateway: &G,
    ) -> impl std::future::Future<Output = OrmResult<FromRowStream<T>>> + Send {
        let built = self.build();
        async move { Ok(FromRowStream::new(gateway.query(built?).await?)) }
    }

    /// Execute and map all rows to `T`.
    fn fetch_all<T: FromRow, G: Gateway>(
        &self,
        gateway: &G,
    ) -> impl std::future::Future<Output = OrmResult<Vec<T>>> + Send {
        let built = self.build();
        async move {
            let rows = gateway.query(built?).await?.collect_rows().await?;
            rows.iter().map(T::from_row).collect()
        }
    }

    /// Execute and map the first row to `T`, if any.
    fn fetch_opt<T: FromRow, G: Gateway>(
        &self,
        gateway: &G,
    ) -> impl std::future::Future<Output = OrmResult<Option<T>>> + Send {
        let built = self.build();
        async move {
            let mut stream = gateway.query(built?).await?;
            match stream.next().await {
                Some(row) => T::from_row(&row?).map(Some),
                None => Ok(None),
            }
        }
    }

    /// Execute and map the first row to `T`; zero rows is [`OrmError::NotFound`].
    fn fetch_one<T: FromRow, G: Gateway>(
        &self,
        gateway: &G,
    ) -> impl std::future::Future<Output = OrmResult<T>> + Send {
        let built = self.build();
        async move {
            let built = built?;
            let table = built.table().to_string();
            let mut stream = gateway.query(built).await?;
            match stream.next().await {
                Some(row) => T::from_row(&row?),
                None => Err(OrmError::not_found(format!("no row returned from '{table}'"))),
            }
        }
    }
}
