#![forbid(unsafe_code)]

fn main() {
    if let Err(error) = ftui_genui_replay::run_from_env() {
        eprintln!("{error}");
        std::process::exit(error.exit_code());
    }
}
