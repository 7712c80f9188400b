use std::env;

pub struct Opts {
    pub subcommand: String,
    pub path: Option<String>,
    pub text: Option<String>,
}

const USAGE: &str = "Usage: scenepipe <run|queue> <pipeline.yaml> <text>\n       scenepipe validate <pipeline.yaml>\n       scenepipe list";

pub fn get_opts() -> Opts {
    let args: Vec<String> = env::args().collect();
    let needed = match args.get(1).map(String::as_str) {
        Some("list") => 2,
        Some("validate") => 3,
        Some(_) => 4,
        None => usize::MAX,
    };
    if args.len() < needed {
        eprintln!("{}", USAGE);
        std::process::exit(1);
    }
    Opts {
        subcommand: args[1].clone(),
        path: args.get(2).cloned(),
        // Anything after the config path is the message, joined back with spaces
        text: (args.len() > 3).then(|| args[3..].join(" ")),
    }
}

pub fn usage() -> &'static str {
    USAGE
}
