extern crate clap;
#[macro_use]
extern crate trackable;
extern crate tsremux;

use clap::{App, Arg};
use std::fs::File;
use std::io::{BufWriter, Write};
use trackable::error::Failure;
use tsremux::demux;
use tsremux::es::{Sample, StreamType};
use tsremux::mux::TsMuxer;
use tsremux::ts::{EsInfo, Pat, Pid, Pmt, ProgramAssociation, VersionNumber};

const PMT_PID: u16 = 0x1000;
const VIDEO_PID: u16 = 0x100;

fn main() {
    let matches = App::new("remux")
        .arg(
            Arg::with_name("INPUT")
                .short("i")
                .long("input")
                .takes_value(true)
                .required(true),
        )
        .arg(
            Arg::with_name("OUTPUT")
                .short("o")
                .long("output")
                .takes_value(true),
        )
        .get_matches();

    let input = matches.value_of("INPUT").unwrap();
    let input = track_try_unwrap!(File::open(input).map_err(Failure::from_error));

    let mut muxer = matches.value_of("OUTPUT").map(|output| {
        let output = track_try_unwrap!(File::create(output).map_err(Failure::from_error));
        let mut muxer = TsMuxer::new(BufWriter::new(output));
        track_try_unwrap!(muxer.write_pat(&pat()));
        track_try_unwrap!(muxer.write_pmt(pid(PMT_PID), &pmt()));
        muxer
    });

    let mut receiver = demux::spawn(input);
    for sample in receiver.by_ref() {
        if sample.stream_type != StreamType::H264 {
            continue;
        }
        println!(
            "{} bytes, pcr={:?}, pts={:?}, dts={:?}, sync={}",
            sample.data.len(),
            sample.pcr.map(|t| t.as_u64()),
            sample.pts.map(|t| t.as_u64()),
            sample.dts.map(|t| t.as_u64()),
            sample.random_access_indicator
        );
        if let Some(ref mut muxer) = muxer {
            let sample = Sample {
                pid: pid(VIDEO_PID),
                ..sample
            };
            track_try_unwrap!(muxer.write_sample(&sample));
        }
    }
    track_try_unwrap!(receiver.finish());
    if let Some(muxer) = muxer {
        track_try_unwrap!(muxer.into_stream().flush().map_err(Failure::from_error));
    }
}

fn pid(n: u16) -> Pid {
    track_try_unwrap!(Pid::new(n))
}

fn pat() -> Pat {
    Pat {
        transport_stream_id: 1,
        version_number: VersionNumber::new(),
        table: vec![ProgramAssociation {
            program_num: 1,
            program_map_pid: pid(PMT_PID),
        }],
    }
}

fn pmt() -> Pmt {
    Pmt {
        program_num: 1,
        pcr_pid: Some(pid(VIDEO_PID)),
        version_number: VersionNumber::new(),
        program_info: Vec::new(),
        es_info: vec![EsInfo {
            stream_type: StreamType::H264,
            elementary_pid: pid(VIDEO_PID),
            descriptors: Vec::new(),
        }],
    }
}
