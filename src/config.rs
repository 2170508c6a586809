use eyre::WrapErr;
use pathkit::{FsPath, GlobPolicy};
use std::path::PathBuf;

pub type Result<T> = eyre::Result<T>;

#[derive(clap::Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// Directory to walk
    #[clap(default_value = ".", env = "PATHWALK_ROOT")]
    pub root: PathBuf,

    /// Report files matching this glob (relative to ROOT). Repeatable.
    #[clap(long, env = "PATHWALK_INCLUDE", value_delimiter = ',')]
    pub include: Vec<String>,

    /// Skip directories matching this glob (relative to ROOT). Repeatable.
    #[clap(long, env = "PATHWALK_EXCLUDE", value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Also report the directories that are walked
    #[clap(long, env = "PATHWALK_DIRS")]
    pub dirs: bool,

    /// Keep the order entries are listed in instead of sorting them
    #[clap(long)]
    pub unsorted: bool,

    /// Print a JSON document instead of one path per line
    #[clap(long)]
    pub json: bool,

    #[clap(long, default_value = "pathwalk=warn,pathkit=warn", env = "PATHWALK_LOG")]
    pub log: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Lines,
    Json,
}

#[derive(Debug)]
pub struct WalkConfig {
    pub root: FsPath,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub include_dirs: bool,
    pub sorted: bool,
    pub output: OutputFormat,
}

impl WalkConfig {
    pub fn root(&self) -> &FsPath {
        &self.root
    }

    pub fn sorted(&self) -> bool {
        self.sorted
    }

    pub fn output(&self) -> OutputFormat {
        self.output
    }

    pub fn policy(&self) -> Result<GlobPolicy> {
        Ok(GlobPolicy::new(&self.root)
            .include(&self.include)?
            .exclude(&self.exclude)?
            .include_dirs(self.include_dirs))
    }
}

impl TryFrom<&Args> for WalkConfig {
    type Error = eyre::Report;

    fn try_from(args: &Args) -> Result<Self> {
        let root = FsPath::new(&args.root)
            .wrap_err_with(|| format!("Invalid walk root '{}'", args.root.display()))?;
        Ok(Self {
            root,
            include: args.include.clone(),
            exclude: args.exclude.clone(),
            include_dirs: args.dirs,
            sorted: !args.unsorted,
            output: if args.json {
                OutputFormat::Json
            } else {
                OutputFormat::Lines
            },
        })
    }
}
