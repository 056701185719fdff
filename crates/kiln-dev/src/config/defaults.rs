use std::path::PathBuf;

pub fn default_frontend_dir() -> PathBuf {
    PathBuf::from("frontend")
}

pub fn default_layout_file() -> PathBuf {
    PathBuf::from("frontend/Layout.tsx")
}

pub fn default_hot_reload_port() -> u16 {
    3001
}

pub fn default_compiler_command() -> String {
    "node".to_string()
}

pub fn default_compiler_args() -> Vec<String> {
    vec![
        "kiln.build.mjs".to_string(),
        "{entry}".to_string(),
        "{outdir}".to_string(),
    ]
}

pub fn default_compiler_out_dir() -> PathBuf {
    PathBuf::from(".kiln")
}

pub fn default_stylesheet_output() -> PathBuf {
    PathBuf::from(".kiln/global.css")
}

pub fn default_stylesheet_timeout_secs() -> u64 {
    30
}
