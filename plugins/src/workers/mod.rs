mod echo;
mod shell;
mod sleep;

pub use echo::EchoWorker;
pub use shell::ShellWorker;
pub use sleep::SleepWorker;
