mod app;

fn main() -> std::process::ExitCode {
    app::run()
}
