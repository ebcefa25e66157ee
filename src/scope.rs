//! Scoped acquisition of the per-worker connection and of nested transactions.
//!
//! Both guards borrow the [`ExecutionContext`] mutably and deref to it, so statements
//! (and further nested scopes) are issued through the guard. Cleanup runs on every
//! exit path: the explicit finishing call, or `Drop` when a `?` or panic unwinds past
//! the guard.

use std::ops::{Deref, DerefMut};

use crate::context::ExecutionContext;
use crate::driver::Driver;
use crate::error::SqlScopeError;

/// Opens the context's connection if it is not open yet and, on exit, releases it only
/// if this scope was the one that opened it. Nested scopes are therefore free.
pub struct ConnectionScope<'c, 'e, D: Driver> {
    ctx: &'c mut ExecutionContext<'e, D>,
    owns_connection: bool,
    exited: bool,
}

impl<'c, 'e, D: Driver> ConnectionScope<'c, 'e, D> {
    /// # Errors
    /// Fails only if the context cannot be opened.
    pub fn enter(ctx: &'c mut ExecutionContext<'e, D>) -> Result<Self, SqlScopeError> {
        let owns_connection = if ctx.is_open() {
            false
        } else {
            ctx.open()?;
            true
        };
        Ok(Self {
            ctx,
            owns_connection,
            exited: false,
        })
    }

    /// Whether leaving this scope will release the connection.
    #[must_use]
    pub fn owns_connection(&self) -> bool {
        self.owns_connection
    }

    /// Leave the scope, surfacing any error from closing the connection.
    ///
    /// # Errors
    /// Returns the driver's close error.
    pub fn exit(mut self) -> Result<(), SqlScopeError> {
        self.exited = true;
        self.release()
    }

    fn release(&mut self) -> Result<(), SqlScopeError> {
        if std::mem::take(&mut self.owns_connection) {
            self.ctx.close()
        } else {
            Ok(())
        }
    }
}

impl<D: Driver> Drop for ConnectionScope<'_, '_, D> {
    fn drop(&mut self) {
        if !self.exited
            && let Err(err) = self.release()
        {
            tracing::warn!("releasing connection on scope drop failed: {err}");
        }
    }
}

impl<'e, D: Driver> Deref for ConnectionScope<'_, 'e, D> {
    type Target = ExecutionContext<'e, D>;

    fn deref(&self) -> &Self::Target {
        self.ctx
    }
}

impl<D: Driver> DerefMut for ConnectionScope<'_, '_, D> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.ctx
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Success,
    Failure,
}

/// Nested transaction demarcation.
///
/// Entering increments the context's transaction depth; only the scope that takes the
/// depth from 0 to 1 starts the real transaction, and only that same scope, on exit,
/// commits or rolls it back. Inner scopes just join.
///
/// Finish a scope with [`commit`](Self::commit) or [`rollback`](Self::rollback).
/// Dropping it unfinished counts as failure. Only the outermost scope's outcome
/// matters: an inner failure that the outer body handles still ends in a commit.
pub struct TransactionScope<'c, 'e, D: Driver> {
    ctx: &'c mut ExecutionContext<'e, D>,
    owns_connection: bool,
    finished: bool,
}

impl<'c, 'e, D: Driver> TransactionScope<'c, 'e, D> {
    /// Begin a transaction, or join the one already running on this context.
    ///
    /// # Errors
    /// Fails only if the context cannot be opened.
    pub fn begin(ctx: &'c mut ExecutionContext<'e, D>) -> Result<Self, SqlScopeError> {
        let owns_connection = if ctx.is_open() {
            false
        } else {
            ctx.open()?;
            true
        };
        if ctx.enter_transaction() == 1 {
            tracing::info!("begin transaction...");
        } else {
            tracing::info!("join current transaction...");
        }
        Ok(Self {
            ctx,
            owns_connection,
            finished: false,
        })
    }

    /// Whether leaving this scope will release the connection.
    #[must_use]
    pub fn owns_connection(&self) -> bool {
        self.owns_connection
    }

    /// Leave the scope successfully. The outermost scope commits.
    ///
    /// # Errors
    /// The commit error (after an attempted rollback), or the close error when this
    /// scope owned the connection.
    pub fn commit(mut self) -> Result<(), SqlScopeError> {
        self.finish(Outcome::Success)
    }

    /// Leave the scope as failed. The outermost scope rolls back.
    ///
    /// # Errors
    /// The rollback error, or the close error when this scope owned the connection.
    pub fn rollback(mut self) -> Result<(), SqlScopeError> {
        self.finish(Outcome::Failure)
    }

    fn finish(&mut self, outcome: Outcome) -> Result<(), SqlScopeError> {
        self.finished = true;
        let result = if self.ctx.leave_transaction() > 0 {
            Ok(())
        } else {
            match outcome {
                Outcome::Success => commit_transaction(self.ctx),
                Outcome::Failure => rollback_transaction(self.ctx),
            }
        };

        let released = if std::mem::take(&mut self.owns_connection) {
            self.ctx.close()
        } else {
            Ok(())
        };
        settle(result, released)
    }
}

impl<D: Driver> Drop for TransactionScope<'_, '_, D> {
    fn drop(&mut self) {
        if !self.finished
            && let Err(err) = self.finish(Outcome::Failure)
        {
            tracing::warn!("rolling back transaction on scope drop failed: {err}");
        }
    }
}

impl<'e, D: Driver> Deref for TransactionScope<'_, 'e, D> {
    type Target = ExecutionContext<'e, D>;

    fn deref(&self) -> &Self::Target {
        self.ctx
    }
}

impl<D: Driver> DerefMut for TransactionScope<'_, '_, D> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.ctx
    }
}

fn commit_transaction<D: Driver>(ctx: &mut ExecutionContext<'_, D>) -> Result<(), SqlScopeError> {
    tracing::info!("commit transaction...");
    let lazy = ctx.lazy_mut()?;
    if !lazy.is_connected() {
        tracing::info!("commit ok.");
        return Ok(());
    }
    match lazy.commit() {
        Ok(()) => {
            tracing::info!("commit ok.");
            Ok(())
        }
        Err(err) => {
            tracing::warn!("commit failed: {err}. try rollback...");
            match lazy.rollback() {
                Ok(()) => tracing::warn!("rollback ok."),
                Err(rollback_err) => {
                    tracing::warn!("rollback after failed commit failed: {rollback_err}");
                }
            }
            Err(err)
        }
    }
}

fn rollback_transaction<D: Driver>(
    ctx: &mut ExecutionContext<'_, D>,
) -> Result<(), SqlScopeError> {
    tracing::warn!("rollback transaction...");
    let lazy = ctx.lazy_mut()?;
    if lazy.is_connected() {
        lazy.rollback()?;
    }
    tracing::info!("rollback ok.");
    Ok(())
}

/// Combine a body's result with the result of the cleanup that followed it. The body's
/// error always wins; a cleanup error only surfaces when the body succeeded.
pub(crate) fn settle<T, E>(result: Result<T, E>, cleanup: Result<(), SqlScopeError>) -> Result<T, E>
where
    E: From<SqlScopeError>,
{
    match (result, cleanup) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(err)) => Err(err.into()),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(cleanup_err)) => {
            tracing::warn!("cleanup after failed scope also failed: {cleanup_err}");
            Err(err)
        }
    }
}
