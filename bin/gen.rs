use clap::{Arg, Command};
use std::io::{self, Write};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let matches = Command::new("gen")
        .about("Generate synthetic CSV with quoted, multi-line and ragged rows")
        .arg(
            Arg::new("rows")
                .long("rows")
                .value_parser(clap::value_parser!(u64))
                .required(true),
        )
        .arg(
            Arg::new("with_header")
                .long("with-header")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(Arg::new("cols").long("cols").default_value("3"))
        .arg(Arg::new("delim").long("delim").default_value(","))
        .arg(
            Arg::new("ragged_every")
                .long("ragged-every")
                .help("Drop trailing fields from every Nth row (0 disables)")
                .value_parser(clap::value_parser!(u64))
                .default_value("0"),
        )
        .get_matches();

    let rows = matches
        .get_one::<u64>("rows")
        .copied()
        .ok_or_else(|| anyhow::anyhow!("--rows is required"))?;
    let with_header = matches.get_flag("with_header");
    let cols: usize = matches
        .get_one::<String>("cols")
        .map(String::as_str)
        .unwrap_or("3")
        .parse()?;
    let delim = matches
        .get_one::<String>("delim")
        .map(String::as_str)
        .unwrap_or(",");
    let ragged_every = matches.get_one::<u64>("ragged_every").copied().unwrap_or(0);

    let mut out = io::BufWriter::new(io::stdout().lock());

    if with_header {
        write!(&mut out, "id")?;
        for i in 1..cols {
            write!(&mut out, "{}col{}", delim, i)?;
        }
        writeln!(&mut out)?;
    }

    // id, then alternating plain text, integers and quoted text with escapes
    for i in 0..rows {
        let width = if ragged_every > 0 && i % ragged_every == 0 {
            cols.div_ceil(2)
        } else {
            cols
        };
        write!(&mut out, "{}", i)?;
        for c in 1..width {
            match c % 3 {
                0 => write!(&mut out, "{}{}", delim, i * c as u64)?,
                1 => write!(&mut out, "{}v{}_{}", delim, c, i)?,
                _ => write!(
                    &mut out,
                    "{}\"note {}{} \\\"{}\\\"\nline two\"",
                    delim, c, delim, i
                )?,
            }
        }
        writeln!(&mut out)?;
        if i % 10_000 == 0 {
            out.flush()?;
        } // keep buffers moving on huge runs
    }

    out.flush()?;
    Ok(())
}
