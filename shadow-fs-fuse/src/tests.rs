use std::fs;
use std::sync::Arc;

use clap::Parser;
use shadow_fs::{Geometry, ShadowFileSystem};

use crate::{Cli, Command, ContextLog, HostDir, ParseError, Shell};

#[test]
fn parse_commands() {
    assert_eq!(Ok(Command::Create("/a".into())), "create /a".parse::<Command>());
    assert_eq!(
        Ok(Command::Write {
            path: "/a".into(),
            offset: 3,
            data: b"hello  world\n".to_vec(),
        }),
        r"write /a 3 hello  world\n".parse::<Command>()
    );
    assert_eq!(
        Ok(Command::Read {
            path: "/a".into(),
            offset: 0,
            len: 5,
        }),
        "read /a 0 5".parse::<Command>()
    );
    assert_eq!(Ok(Command::Unlink("/a".into())), "rm /a".parse::<Command>());
    assert_eq!(Ok(Command::Ls("/".into())), "ls".parse::<Command>());
    assert_eq!(Ok(Command::Exit), "quit".parse::<Command>());
}

#[test]
fn parse_errors() {
    assert_eq!(
        Err(ParseError::Unknown("frobnicate".into())),
        "frobnicate /a".parse::<Command>()
    );
    assert_eq!(
        Err(ParseError::RelativePath("a".into())),
        "create a".parse::<Command>()
    );
    assert_eq!(
        Err(ParseError::Number("x".into())),
        "read /a x 5".parse::<Command>()
    );
    assert_eq!(
        Err(ParseError::Usage("read <path> <offset> <len>")),
        "read /a 0".parse::<Command>()
    );
    assert_eq!(
        Err(ParseError::Usage("unlink <path>")),
        "unlink /a /b".parse::<Command>()
    );
}

#[test]
fn cli() {
    let cli = Cli::try_parse_from([
        "shadow-fs-fuse",
        "--log-file",
        "log.txt",
        "--root-dir",
        "root",
        "-i",
        "4",
        "-b",
        "8",
        "-s",
        "16",
    ])
    .unwrap();
    assert_eq!(4, cli.inodes);
    assert_eq!(8, cli.data_blocks);
    assert_eq!(16, cli.block_size);
    assert!(cli.script.is_none());
    assert!(!cli.allow_root);

    assert!(Cli::try_parse_from(["shadow-fs-fuse", "--inodes", "4"]).is_err());
}

#[test]
fn shell_session() {
    let root = tempfile::tempdir().unwrap();
    let device = Arc::new(HostDir::new(root.path()).unwrap());
    let fs = ShadowFileSystem::mount(Geometry::new(4, 4, 4).unwrap(), device);
    let mut shell = Shell::new(fs, ContextLog::new(Vec::new()));

    let script = "\
        # comment\n\
        create /a\n\
        write /a 0 hello\n\
        read /a 0 5\n\
        read /missing 0 1\n\
        bogus\n\
        create /../x\n\
        unlink /a\n\
        exit\n\
        create /never\n";
    let mut out = Vec::new();
    shell.run(script.as_bytes(), &mut out).unwrap();

    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("/a: inode 0"));
    assert!(out.contains("wrote 5 bytes"));
    assert!(out.contains("hello\n"));
    assert!(out.contains(&format!("errno {}", libc::ENOENT)));
    assert!(out.contains("unknown command: bogus"));
    assert!(out.contains(&format!("errno {}", libc::EINVAL)));

    let (fs, log) = shell.into_inner();
    let log = String::from_utf8(log.into_inner().unwrap()).unwrap();
    assert!(log.starts_with("CREATE /a\nPATH_TO_INODE_MAP:\n/a: 0\n"));
    assert!(log.contains("WRITE /a\n"));
    assert!(log.contains("inode0: hello\0\0\0\n"));
    assert!(log.contains("READ /missing\nERROR: READ /missing\n"));
    assert!(log.contains("CREATE /../x\nERROR: CREATE /../x\n"));
    assert!(log.contains("DELETE /a\nPATH_TO_INODE_MAP:\nINODE_BITMAP: [0, 0, 0, 0]\n"));
    assert!(!log.contains("/never"));

    assert!(fs.dump().paths.is_empty());
    assert!(!root.path().join("a").exists());
    assert!(fs::read_dir(root.path()).unwrap().next().is_none());
}
