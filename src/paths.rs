use std::path::{Path, PathBuf};

pub fn out_gds(work_dir: impl AsRef<Path>, name: impl AsRef<str>) -> PathBuf {
    PathBuf::from(work_dir.as_ref()).join(format!("{}.gds", name.as_ref()))
}

pub fn out_svg(work_dir: impl AsRef<Path>, name: impl AsRef<str>) -> PathBuf {
    PathBuf::from(work_dir.as_ref()).join(format!("{}.svg", name.as_ref()))
}

pub fn out_map(work_dir: impl AsRef<Path>, name: impl AsRef<str>) -> PathBuf {
    PathBuf::from(work_dir.as_ref()).join(format!("{}_map.svg", name.as_ref()))
}

pub fn out_json(work_dir: impl AsRef<Path>, name: impl AsRef<str>) -> PathBuf {
    PathBuf::from(work_dir.as_ref()).join(format!("{}.json", name.as_ref()))
}
