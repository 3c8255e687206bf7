use brrrometer_core::SourceInfo;
use brrrometer_core::sources::all_sources;

pub fn run(index: u32) {
    let sources = all_sources(index);
    let available = sources.iter().filter(|s| s.is_available()).count();

    println!("Found {available} usable GPU utilization source(s) for device {index}:\n");
    for src in &sources {
        println!("{}", source_line(src.info(), src.is_available()));
    }
}

fn source_line(info: &SourceInfo, usable: bool) -> String {
    let mark = if usable { "\u{2705}" } else { "\u{274C}" };
    format!(
        "  {mark} {:<16} {:<12} {:<6} {}",
        info.name, info.kind, info.platform, info.description
    )
}
