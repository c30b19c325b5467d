//! doclock CLI
//!
//! Binary name: `doclock`

use std::process;

use doclock::cli::{
    build_cli,
    handlers::{dispatch, exit_code, format_error},
    setup::init_tracing,
};

fn main() {
    let matches = match build_cli().try_get_matches() {
        Ok(matches) => matches,
        Err(err) => {
            // Help and version go to stdout and succeed; bad arguments are
            // validation failures.
            let code = i32::from(err.use_stderr());
            let _ = err.print();
            #[allow(clippy::exit)]
            process::exit(code);
        }
    };

    init_tracing(matches.get_flag("verbose"));

    if let Err(err) = dispatch(&matches) {
        let code = exit_code(&err);
        if matches.get_flag("json") {
            let payload = serde_json::json!({
                "success": false,
                "error": format_error(&err),
                "exit_code": code,
            });
            println!("{payload}");
        } else {
            #[allow(clippy::print_stderr)]
            {
                eprintln!("Error: {}", format_error(&err));
            }
        }

        #[allow(clippy::exit)]
        process::exit(code);
    }
}
