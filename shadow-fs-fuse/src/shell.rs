//! 命令行外壳，扮演分派层：把每条命令转给 [`ShadowFileSystem`]，
//! 并在上下文日志里记下操作与之后的影子状态。

use std::io::{self, BufRead, Write};
use std::str::FromStr;

use enumflags2::BitFlags;
use shadow_fs::ShadowFileSystem;
use thiserror::Error;
use vfs::{OpenFlag, Permission};

use crate::context_log::{ContextLog, Op};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Create(String),
    Write {
        path: String,
        offset: usize,
        data: Vec<u8>,
    },
    Read {
        path: String,
        offset: usize,
        len: usize,
    },
    Unlink(String),
    Mkdir(String),
    Rmdir(String),
    Ls(String),
    Stat(String),
    Dump,
    Help,
    Exit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("invalid number: {0}")]
    Number(String),
    #[error("path must be absolute: {0}")]
    RelativePath(String),
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim_start();
        let (cmd, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let mut args = rest.split_whitespace();

        let command = match cmd {
            "create" | "touch" => Command::Create(path(args.next(), "create <path>")?),
            "write" => {
                const USAGE: &str = "write <path> <offset> <text>";
                let path = path(args.next(), USAGE)?;
                let offset = number(args.next(), USAGE)?;
                // 正文是偏移之后的整段余下内容，保留其中的空白
                let data = rest
                    .trim_start()
                    .split_once(char::is_whitespace)
                    .and_then(|(_, rest)| rest.trim_start().split_once(char::is_whitespace))
                    .map(|(_, text)| unescape(text))
                    .unwrap_or_default();
                return Ok(Command::Write { path, offset, data });
            }
            "read" | "cat" => {
                const USAGE: &str = "read <path> <offset> <len>";
                Command::Read {
                    path: path(args.next(), USAGE)?,
                    offset: number(args.next(), USAGE)?,
                    len: number(args.next(), USAGE)?,
                }
            }
            "unlink" | "rm" => Command::Unlink(path(args.next(), "unlink <path>")?),
            "mkdir" => Command::Mkdir(path(args.next(), "mkdir <path>")?),
            "rmdir" => Command::Rmdir(path(args.next(), "rmdir <path>")?),
            "ls" => Command::Ls(args.next().unwrap_or("/").to_owned()),
            "stat" => Command::Stat(path(args.next(), "stat <path>")?),
            "dump" => Command::Dump,
            "help" => Command::Help,
            "exit" | "quit" => Command::Exit,
            _ => return Err(ParseError::Unknown(cmd.to_owned())),
        };

        if args.next().is_some() {
            return Err(ParseError::Usage(command.usage()));
        }
        Ok(command)
    }
}

impl Command {
    fn usage(&self) -> &'static str {
        match self {
            Command::Create(_) => "create <path>",
            Command::Write { .. } => "write <path> <offset> <text>",
            Command::Read { .. } => "read <path> <offset> <len>",
            Command::Unlink(_) => "unlink <path>",
            Command::Mkdir(_) => "mkdir <path>",
            Command::Rmdir(_) => "rmdir <path>",
            Command::Ls(_) => "ls [path]",
            Command::Stat(_) => "stat <path>",
            Command::Dump => "dump",
            Command::Help => "help",
            Command::Exit => "exit",
        }
    }
}

fn path(arg: Option<&str>, usage: &'static str) -> Result<String, ParseError> {
    let path = arg.ok_or(ParseError::Usage(usage))?;
    if !path.starts_with('/') {
        return Err(ParseError::RelativePath(path.to_owned()));
    }
    Ok(path.to_owned())
}

fn number(arg: Option<&str>, usage: &'static str) -> Result<usize, ParseError> {
    let arg = arg.ok_or(ParseError::Usage(usage))?;
    arg.parse().map_err(|_| ParseError::Number(arg.to_owned()))
}

/// 支持`\n`、`\t`、`\0`与`\\`
fn unescape(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len());
    let mut chars = text.bytes();
    while let Some(byte) = chars.next() {
        if byte != b'\\' {
            bytes.push(byte);
            continue;
        }
        match chars.next() {
            Some(b'n') => bytes.push(b'\n'),
            Some(b't') => bytes.push(b'\t'),
            Some(b'0') => bytes.push(0),
            Some(other) => bytes.push(other),
            None => bytes.push(b'\\'),
        }
    }
    bytes
}

pub struct Shell<W: Write> {
    fs: ShadowFileSystem,
    log: ContextLog<W>,
}

impl<W: Write> Shell<W> {
    pub fn new(fs: ShadowFileSystem, log: ContextLog<W>) -> Self {
        Self { fs, log }
    }

    /// 逐行执行命令直到输入结束或遇到`exit`
    pub fn run(&mut self, input: impl BufRead, out: &mut impl Write) -> io::Result<()> {
        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match line.parse::<Command>() {
                Ok(Command::Exit) => break,
                Ok(command) => self.execute(command, out)?,
                Err(err) => writeln!(out, "{err}")?,
            }
        }
        Ok(())
    }

    pub fn execute(&mut self, command: Command, out: &mut impl Write) -> io::Result<()> {
        match command {
            Command::Create(path) => {
                let flags: BitFlags<OpenFlag> = OpenFlag::CREATE | OpenFlag::WRONLY | OpenFlag::TRUNC;
                let result = self.fs.create(&path, flags, Permission::file_default());
                self.logged(Op::Create, &path, result, out, |handle, out| {
                    writeln!(out, "{path}: inode {}", handle.inode)
                })
            }
            Command::Write { path, offset, data } => {
                let result = self.fs.write(&path, &data, offset);
                self.logged(Op::Write, &path, result, out, |written, out| {
                    writeln!(out, "wrote {written} bytes")
                })
            }
            Command::Read { path, offset, len } => {
                let result = self.fs.read(&path, offset, len);
                self.logged(Op::Read, &path, result, out, |bytes, out| {
                    out.write_all(&bytes)?;
                    writeln!(out)
                })
            }
            Command::Unlink(path) => {
                let result = self.fs.unlink(&path);
                self.logged(Op::Delete, &path, result, out, |(), _| Ok(()))
            }
            Command::Mkdir(path) => report(self.fs.mkdir(&path, Permission::dir_default()), out),
            Command::Rmdir(path) => report(self.fs.rmdir(&path), out),
            Command::Ls(path) => match self.fs.read_dir(&path) {
                Ok(mut entries) => {
                    entries.sort_unstable_by(|a, b| a.name.cmp(&b.name));
                    for entry in entries {
                        writeln!(out, "{:>8} {:?} {}", entry.inode, entry.ty, entry.name)?;
                    }
                    Ok(())
                }
                Err(err) => report::<()>(Err(err), out),
            },
            Command::Stat(path) => match self.fs.stat(&path) {
                Ok(stat) => writeln!(
                    out,
                    "{path}: {:?} inode={} size={} blocks={} block_size={}",
                    stat.mode, stat.inode, stat.size, stat.blocks, stat.block_size
                ),
                Err(err) => report::<()>(Err(err), out),
            },
            Command::Dump => write!(out, "{}", self.fs.dump()),
            Command::Help => do_help(out),
            Command::Exit => Ok(()),
        }
    }

    pub fn into_inner(self) -> (ShadowFileSystem, ContextLog<W>) {
        (self.fs, self.log)
    }

    /// 按上下文日志的格式记下一次操作，再把结果交给`on_ok`输出
    fn logged<T>(
        &mut self,
        op: Op,
        path: &str,
        result: vfs::Result<T>,
        out: &mut impl Write,
        on_ok: impl FnOnce(T, &mut dyn Write) -> io::Result<()>,
    ) -> io::Result<()> {
        self.log.op(op, path)?;
        let outcome = match result {
            Ok(value) => on_ok(value, out),
            Err(err) => {
                log::warn!("{op} {path} failed: {err}");
                self.log.failure(op, path)?;
                writeln!(out, "error: {err} (errno {})", err.errno())
            }
        };
        self.log.context(&self.fs.dump())?;
        outcome
    }
}

fn report<T>(result: vfs::Result<T>, out: &mut impl Write) -> io::Result<()> {
    match result {
        Ok(_) => Ok(()),
        Err(err) => writeln!(out, "error: {err} (errno {})", err.errno()),
    }
}

fn do_help(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "Commands are:")?;
    for usage in [
        "create  <path>",
        "write   <path> <offset> <text>",
        "read    <path> <offset> <len>",
        "unlink  <path>",
        "mkdir   <path>",
        "rmdir   <path>",
        "ls      [path]",
        "stat    <path>",
        "dump",
        "help",
        "exit",
    ] {
        writeln!(out, "      {usage}")?;
    }
    Ok(())
}
