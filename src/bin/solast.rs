use clap::Parser;

use solast::cli::{run, Cli};
use solast::print_error;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = run(cli) {
        print_error(error);
        std::process::exit(1);
    }
}
