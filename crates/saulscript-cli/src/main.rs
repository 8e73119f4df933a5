use std::{env, fs, process::ExitCode};

use saulscript::{Context, NoopTracer, Script, StderrTracer, Value};

struct Args {
    file_path: String,
    op_limit: Option<i64>,
    time_limit: Option<f64>,
    trace: bool,
}

fn main() -> ExitCode {
    let args = match parse_args() {
        Ok(args) => args,
        Err(err) => {
            eprintln!("error: {err}");
            eprintln!("usage: saul <file> [--op-limit N] [--time-limit SECS] [--trace]");
            return ExitCode::FAILURE;
        }
    };

    let code = match read_file(&args.file_path) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let script = match Script::compile(&code) {
        Ok(script) => script,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut ctx = Context::new();
    if let Some(limit) = args.op_limit {
        ctx.set_op_limit(limit);
    }
    if let Some(limit) = args.time_limit {
        ctx.set_time_limit(limit);
    }
    bind_output(&mut ctx);

    let result = if args.trace {
        script.run_traced(&mut ctx, &mut StderrTracer::new())
    } else {
        script.run_traced(&mut ctx, &mut NoopTracer)
    };
    if let Err(err) = result {
        eprintln!("error: {err}");
        return ExitCode::FAILURE;
    }

    println!("{ctx}");
    if *ctx.return_value() != Value::None {
        println!("return value: {}", ctx.return_value().repr());
    }
    ExitCode::SUCCESS
}

/// Binds the `print` and `tell` natives; both print their first
/// argument to stdout and evaluate to `true`.
fn bind_output(ctx: &mut Context) {
    for name in ["print", "tell"] {
        ctx.bind_function(name, |args| {
            if let Some(arg) = args.first() {
                println!("{arg}");
            }
            Ok(Value::Bool(true))
        });
    }
}

fn parse_args() -> Result<Args, String> {
    let mut args = env::args().skip(1);
    let mut parsed = Args {
        file_path: String::new(),
        op_limit: None,
        time_limit: None,
        trace: false,
    };
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--op-limit" => {
                let value = args.next().ok_or("--op-limit requires a value")?;
                let limit = value.parse().map_err(|_| format!("invalid --op-limit: {value}"))?;
                parsed.op_limit = Some(limit);
            }
            "--time-limit" => {
                let value = args.next().ok_or("--time-limit requires a value")?;
                let limit = value.parse().map_err(|_| format!("invalid --time-limit: {value}"))?;
                parsed.time_limit = Some(limit);
            }
            "--trace" => parsed.trace = true,
            other if other.starts_with("--") => {
                return Err(format!("unknown flag: {other}"));
            }
            path => {
                if !parsed.file_path.is_empty() {
                    return Err(format!("unexpected argument: {path}"));
                }
                parsed.file_path = path.to_owned();
            }
        }
    }
    if parsed.file_path.is_empty() {
        return Err("no script file given".to_owned());
    }
    Ok(parsed)
}

fn read_file(file_path: &str) -> Result<String, String> {
    match fs::metadata(file_path) {
        Ok(metadata) => {
            if !metadata.is_file() {
                return Err(format!("{file_path} is not a file"));
            }
        }
        Err(err) => {
            return Err(format!("cannot read {file_path}: {err}"));
        }
    }
    fs::read_to_string(file_path).map_err(|err| format!("cannot read {file_path}: {err}"))
}
