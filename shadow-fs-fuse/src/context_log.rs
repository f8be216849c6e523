use std::fmt::{self, Display};
use std::fs::File;
use std::io::{self, LineWriter, Write};
use std::path::Path;

use shadow_fs::Dump;

/// 上下文日志中记录的操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Create,
    Write,
    Read,
    Delete,
}

impl Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Op::Create => "CREATE",
            Op::Write => "WRITE",
            Op::Read => "READ",
            Op::Delete => "DELETE",
        })
    }
}

/// 行缓冲的上下文日志：每次操作一行，紧接着一份影子状态快照
#[derive(Debug)]
pub struct ContextLog<W: Write> {
    out: LineWriter<W>,
}

impl ContextLog<File> {
    /// 日志文件每次运行都会被截断重写
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: Write> ContextLog<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: LineWriter::new(out),
        }
    }

    pub fn op(&mut self, op: Op, path: &str) -> io::Result<()> {
        writeln!(self.out, "{op} {path}")
    }

    pub fn failure(&mut self, op: Op, path: &str) -> io::Result<()> {
        writeln!(self.out, "ERROR: {op} {path}")
    }

    pub fn context(&mut self, dump: &Dump) -> io::Result<()> {
        write!(self.out, "{dump}")
    }

    pub fn into_inner(self) -> io::Result<W> {
        self.out.into_inner().map_err(|err| err.into_error())
    }
}
