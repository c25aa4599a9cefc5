//! `ssfs`: a stdin-driven command loop over a single mounted volume. A REPL
//! rather than a one-shot-per-invocation CLI, since several commands
//! (`create`, `read`, `write`, ...) only make sense against a volume a
//! previous command already mounted in the same process.

use std::io::{self, BufRead, Write};

use ssfs::error::Coded;
use ssfs::session;

fn main() {
    let stdin = io::stdin();
    let mut out = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("ssfs: error: {e}");
                break;
            }
        };
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some(&cmd) = words.first() else {
            continue;
        };

        match cmd {
            "quit" | "exit" => break,
            _ => run(cmd, &words[1..], &mut out),
        }
        let _ = out.flush();
    }
}

fn run(cmd: &str, args: &[&str], out: &mut impl Write) {
    match cmd {
        "format" => match args {
            [path, inodes] => match inodes.parse::<u32>() {
                Ok(n) => report(out, cmd, session::format(path, n).map(|()| 0)),
                Err(_) => eprintln!("ssfs: format: invalid inode count {inodes:?}"),
            },
            _ => eprintln!("ssfs: usage: format <img> <inodes>"),
        },
        "mount" => match args {
            [path] => report(out, cmd, session::mount(path).map(|()| 0)),
            _ => eprintln!("ssfs: usage: mount <img>"),
        },
        "unmount" => report(out, cmd, session::unmount().map(|()| 0)),
        "create" => report(out, cmd, session::create().map(|i| i as i64)),
        "delete" => match parse_inode(args) {
            Some(i) => report(out, cmd, session::delete(i).map(|()| 0)),
            None => eprintln!("ssfs: usage: delete <n>"),
        },
        "stat" => match parse_inode(args) {
            Some(i) => report(out, cmd, session::stat(i).map(|s| s.size as i64)),
            None => eprintln!("ssfs: usage: stat <n>"),
        },
        "read" => match args {
            [n, offset, len] => match (n.parse::<u32>(), offset.parse::<u64>(), len.parse::<usize>()) {
                (Ok(i), Ok(offset), Ok(len)) => {
                    let mut buf = vec![0u8; len];
                    match session::read(i, offset, &mut buf) {
                        Ok(n) => {
                            let text = String::from_utf8_lossy(&buf[..n]);
                            let _ = writeln!(out, "read: {n} {text}");
                        }
                        Err(e) => eprintln!("ssfs: read: error: {}", Coded(&e)),
                    }
                }
                _ => eprintln!("ssfs: read: invalid arguments"),
            },
            _ => eprintln!("ssfs: usage: read <n> <offset> <len>"),
        },
        "write" => match args {
            [n, offset, data] => match (n.parse::<u32>(), offset.parse::<u64>()) {
                (Ok(i), Ok(offset)) => {
                    report(out, cmd, session::write(i, offset, data.as_bytes()).map(|n| n as i64))
                }
                _ => eprintln!("ssfs: write: invalid arguments"),
            },
            _ => eprintln!("ssfs: usage: write <n> <offset> <ascii-data>"),
        },
        _ => eprintln!("ssfs: unknown command {cmd:?}"),
    }
}

fn parse_inode(args: &[&str]) -> Option<u32> {
    match args {
        [n] => n.parse().ok(),
        _ => None,
    }
}

fn report(out: &mut impl Write, cmd: &str, result: ssfs::Result<i64>) {
    match result {
        Ok(value) => {
            let _ = writeln!(out, "{cmd}: {value}");
        }
        Err(e) => eprintln!("ssfs: {cmd}: error: {}", Coded(&e)),
    }
}
