use std::ffi::CString;
use std::path::Path;
use std::ptr::null;

use clap::{App, Arg};
use libc::*;

fn main() {
    let cmd = App::new("crucible_cell")
        .version("0.1.0")
        .about("Resource-limit loader for untrusted programs")
        .arg(
            Arg::with_name("memory_limit")
                .long("memory_limit")
                .short("m")
                .help("set memory limit(MB) for the program")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("time_limit")
                .long("time_limit")
                .short("t")
                .help("set time limit(ms) for the program")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("path")
                .index(1)
                .help("execution path")
                .required(true),
        )
        .arg(
            Arg::with_name("raw")
                .multiple(true)
                .last(true)
                .help("arguments for the program"),
        )
        .get_matches();

    let path = Path::new(cmd.value_of("path").unwrap());
    if !path.exists() {
        eprintln!("cell: path does not exist");
        std::process::exit(1);
    }

    // own process group, so the judge can take down every descendant with
    // one signal
    unsafe {
        setpgid(0, 0);
    }

    if let Some(memory_limit) = cmd.value_of("memory_limit") {
        let memory_limit = memory_limit.trim().parse::<u64>().unwrap();
        set_memory_limit(memory_limit);
    }
    if let Some(time_limit) = cmd.value_of("time_limit") {
        let time_limit = time_limit.trim().parse::<u64>().unwrap();
        set_time_limit(time_limit);
    }

    let exe = CString::new(path.to_str().unwrap()).unwrap();
    let argv0 = CString::new(path.file_name().unwrap().to_str().unwrap()).unwrap();
    let raw_args: Vec<CString> = cmd
        .values_of("raw")
        .unwrap_or_default()
        .map(|arg| CString::new(arg).unwrap())
        .collect();

    let mut argv: Vec<*const c_char> = Vec::with_capacity(raw_args.len() + 2);
    argv.push(argv0.as_ptr());
    for arg in &raw_args {
        argv.push(arg.as_ptr());
    }
    argv.push(null());

    unsafe {
        execvp(exe.as_ptr(), argv.as_ptr());
    }

    // only reached when exec failed
    eprintln!("cell: failed to load program");
    std::process::exit(1);
}

fn set_memory_limit(lim: u64) {
    // twice the configured limit, so allocation failure surfaces in the
    // program before the kernel has to step in
    let ctx = rlimit64 {
        rlim_cur: lim << 10 << 10 << 1,
        rlim_max: lim << 10 << 10 << 1,
    };
    let ctx: *const rlimit64 = &ctx;
    unsafe {
        assert!(setrlimit64(RLIMIT_AS, ctx) == 0);
    }
}

fn set_time_limit(lim: u64) {
    let ctx = rlimit64 {
        rlim_cur: (lim + 1000) / 1000,
        rlim_max: (lim + 1000) / 1000,
    };
    let ctx: *const rlimit64 = &ctx;
    unsafe {
        assert!(setrlimit64(RLIMIT_CPU, ctx) == 0);
    }
}
