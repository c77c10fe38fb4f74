//! Command Dispatch & Custom Command Extension (spec §4.5, §5).
//!
//! Routes one parsed verb/argument pair to its handler. Built-in verbs are
//! tried first, then the fixed-size custom command table, then a final
//! `502` fallback — the same three-tier order `ps4_ftp.cpp`'s
//! `ftps4_client_thread` uses.

use std::io;

use async_trait::async_trait;

use crate::command;
use crate::context::ServerContext;
use crate::fs::Filesystem;
use crate::session::{Control, Session};

/// Maximum number of custom commands the server can register (spec §5).
pub const MAX_CUSTOM_COMMANDS: usize = 16;

/// A server-defined command slotted in alongside the built-ins.
///
/// Grounded on `rs9p::srv::Filesystem`'s async-trait shape: a narrow,
/// single-method trait object implementors fill in per command.
#[async_trait]
pub trait CustomCommand<F: Filesystem>: Send + Sync {
    /// The verb this handler answers to, compared case-sensitively and by
    /// exact match, the same way the built-in table is (spec §4.5).
    fn name(&self) -> &str;

    async fn call(
        &self,
        session: &mut Session,
        ctx: &ServerContext<F>,
        ctrl: &mut Control,
        arg: Option<&str>,
    ) -> io::Result<()>;
}

/// Fixed 16-slot registration table (spec §5: "a bounded array of command
/// slots, not a growable collection").
pub struct CustomCommandTable<F: Filesystem> {
    slots: [Option<Box<dyn CustomCommand<F>>>; MAX_CUSTOM_COMMANDS],
}

impl<F: Filesystem> CustomCommandTable<F> {
    pub fn new() -> Self {
        CustomCommandTable {
            slots: std::array::from_fn(|_| None),
        }
    }

    /// Register `cmd` in the first free slot.
    ///
    /// Returns [`crate::error::Error::CustomCommandTableFull`] once all 16
    /// slots are occupied — the table never grows past that, matching the
    /// source's fixed `ftps4_custom_commands[16]` array.
    pub fn register(&mut self, cmd: Box<dyn CustomCommand<F>>) -> crate::error::Result<()> {
        for slot in self.slots.iter_mut() {
            if slot.is_none() {
                *slot = Some(cmd);
                return Ok(());
            }
        }
        Err(crate::error::Error::CustomCommandTableFull)
    }

    /// Clear the first slot whose command name matches `name`.
    ///
    /// Returns `true` if a slot was cleared, mirroring
    /// `ftps4_ext_del_custom_command`'s success/failure return.
    pub fn unregister(&mut self, name: &str) -> bool {
        for slot in self.slots.iter_mut() {
            if slot.as_deref().is_some_and(|c| c.name() == name) {
                *slot = None;
                return true;
            }
        }
        false
    }

    fn find(&self, verb: &str) -> Option<&dyn CustomCommand<F>> {
        self.slots
            .iter()
            .filter_map(|s| s.as_deref())
            .find(|c| c.name() == verb)
    }
}

impl<F: Filesystem> Default for CustomCommandTable<F> {
    fn default() -> Self {
        Self::new()
    }
}

/// Route one command line to its handler.
///
/// `verb` is matched case-sensitively and by exact string equality against
/// the built-in set first (spec §4.5: "Lookup is linear, case-sensitive,
/// exact match"), then against `custom`, then falls through to a final
/// `502`.
pub async fn dispatch<F: Filesystem>(
    session: &mut Session,
    ctx: &ServerContext<F>,
    custom: &CustomCommandTable<F>,
    ctrl: &mut Control,
    verb: &str,
    arg: Option<&str>,
) -> io::Result<()> {
    command::log_command(session.num, verb, arg);

    match verb {
        "NOOP" => command::noop(ctrl).await,
        "USER" => command::user(ctrl).await,
        "PASS" => command::pass(ctrl).await,
        "QUIT" => command::quit(ctrl).await,
        "SYST" => command::syst(ctrl).await,
        "FEAT" => command::feat(ctrl).await,
        "TYPE" => command::type_(ctrl, arg).await,
        "PWD" => command::pwd(session, ctrl).await,
        "CWD" => command::cwd(session, ctx, ctrl, arg).await,
        "CDUP" => command::cdup(session, ctrl).await,
        "PASV" => command::pasv(session, ctx, ctrl).await,
        "PORT" => command::port(session, ctrl, arg).await,
        "LIST" => command::list(session, ctx, ctrl, arg).await,
        "RETR" => command::retr(session, ctx, ctrl, arg).await,
        "STOR" => command::stor(session, ctx, ctrl, arg).await,
        "APPE" => command::appe(session, ctx, ctrl, arg).await,
        "DELE" => command::dele(session, ctx, ctrl, arg).await,
        "RMD" => command::rmd(session, ctx, ctrl, arg).await,
        "MKD" => command::mkd(session, ctx, ctrl, arg).await,
        "RNFR" => command::rnfr(session, ctx, ctrl, arg).await,
        "RNTO" => command::rnto(session, ctx, ctrl, arg).await,
        "SIZE" => command::size(session, ctx, ctrl, arg).await,
        "REST" => command::rest(session, ctrl, arg).await,
        _ => {
            if let Some(cmd) = custom.find(verb) {
                cmd.call(session, ctx, ctrl, arg).await
            } else {
                command::unimplemented(ctrl).await
            }
        }
    }
}
