use crate::ts::psi::{Psi, PsiTable, PsiTableHeader, PsiTableSyntax};
use crate::ts::{Pid, VersionNumber};
use crate::{ErrorKind, Result};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::collections::HashSet;
use std::io::{Read, Write};

/// Program Association Table.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pat {
    pub transport_stream_id: u16,
    pub version_number: VersionNumber,

    /// Entries in the order they appear in the section.
    ///
    /// Program numbers are unique in a table.
    pub table: Vec<ProgramAssociation>,
}
impl Pat {
    const TABLE_ID: u8 = 0;

    /// Decodes a PAT from the payload of a TS packet (pointer field included).
    ///
    /// # Errors
    ///
    /// If the payload does not contain a well-formed PAT section,
    /// it will return an `ErrorKind::InvalidInput` error.
    /// If the CRC-32 of the section is wrong, it will return an `ErrorKind::Crc32Mismatch` error.
    pub fn read_from<R: Read>(reader: R) -> Result<Self> {
        let mut psi = track!(Psi::read_from(reader))?;
        track_assert_eq!(psi.tables.len(), 1, ErrorKind::InvalidInput);

        let table = psi.tables.pop().expect("Never fails");
        let header = table.header;
        track_assert_eq!(
            header.table_id,
            Self::TABLE_ID,
            ErrorKind::InvalidInput,
            "Not a PAT"
        );
        track_assert!(!header.private_bit, ErrorKind::InvalidInput);

        let syntax = track_assert_some!(table.syntax.as_ref(), ErrorKind::InvalidInput);
        track_assert_eq!(syntax.section_number, 0, ErrorKind::Unsupported);
        track_assert_eq!(syntax.last_section_number, 0, ErrorKind::Unsupported);
        track_assert!(syntax.current_next_indicator, ErrorKind::Unsupported);

        let mut reader = &syntax.table_data[..];
        let mut table = Vec::new();
        while !reader.is_empty() {
            table.push(track!(ProgramAssociation::read_from(&mut reader))?);
        }
        let pat = Pat {
            transport_stream_id: syntax.table_id_extension,
            version_number: syntax.version_number,
            table,
        };
        track!(pat.check_program_nums())?;
        Ok(pat)
    }

    /// Encodes the PAT as a TS packet payload (pointer field included, no stuffing bytes).
    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        track!(self.to_psi().and_then(|psi| psi.write_to(writer)))
    }

    fn check_program_nums(&self) -> Result<()> {
        let mut program_nums = HashSet::new();
        for pa in &self.table {
            track_assert!(
                program_nums.insert(pa.program_num),
                ErrorKind::InvalidInput,
                "Duplicate program number: {}",
                pa.program_num
            );
        }
        Ok(())
    }

    fn to_psi(&self) -> Result<Psi> {
        track!(self.check_program_nums())?;

        let mut table_data = Vec::new();
        for pa in &self.table {
            track!(pa.write_to(&mut table_data))?;
        }

        let header = PsiTableHeader {
            table_id: Self::TABLE_ID,
            private_bit: false,
        };
        let syntax = Some(PsiTableSyntax {
            table_id_extension: self.transport_stream_id,
            version_number: self.version_number,
            current_next_indicator: true,
            section_number: 0,
            last_section_number: 0,
            table_data,
        });
        let tables = vec![PsiTable { header, syntax }];
        Ok(Psi { tables })
    }
}

/// An entry of a program association table.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProgramAssociation {
    /// Program number (`0` designates the network information table).
    pub program_num: u16,

    /// The packet identifier that contains the associated PMT.
    pub program_map_pid: Pid,
}
impl ProgramAssociation {
    fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        let program_num = track_io!(reader.read_u16::<BigEndian>())?;
        let program_map_pid = track!(Pid::read_from(reader))?;
        Ok(ProgramAssociation {
            program_num,
            program_map_pid,
        })
    }

    fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        track_io!(writer.write_u16::<BigEndian>(self.program_num))?;
        track!(self.program_map_pid.write_to(writer))?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn pat_payload() -> &'static [u8] {
        &[
            0, 0, 176, 13, 0, 0, 195, 0, 0, 0, 1, 225, 224, 232, 95, 116, 236, 255, 255, 255,
        ][..]
    }

    #[test]
    fn decode_real_pat() {
        let pat = track_try_unwrap!(Pat::read_from(pat_payload()));
        assert_eq!(pat.transport_stream_id, 0);
        assert_eq!(pat.version_number.as_u8(), 1);
        assert_eq!(
            pat.table,
            vec![ProgramAssociation {
                program_num: 1,
                program_map_pid: track_try_unwrap!(Pid::new(480)),
            }]
        );

        let mut buf = Vec::new();
        track_try_unwrap!(pat.write_to(&mut buf));
        assert_eq!(&buf[..], &pat_payload()[..17]);
    }

    #[test]
    fn round_trip() {
        let pat = Pat {
            transport_stream_id: 0x1234,
            version_number: track_try_unwrap!(VersionNumber::from_u8(5)),
            table: vec![
                ProgramAssociation {
                    program_num: 0,
                    program_map_pid: track_try_unwrap!(Pid::new(0x10)),
                },
                ProgramAssociation {
                    program_num: 7,
                    program_map_pid: track_try_unwrap!(Pid::new(0x1000)),
                },
                ProgramAssociation {
                    program_num: 3,
                    program_map_pid: track_try_unwrap!(Pid::new(0x1FFE)),
                },
            ],
        };
        let mut buf = Vec::new();
        track_try_unwrap!(pat.write_to(&mut buf));
        assert_eq!(track_try_unwrap!(Pat::read_from(&buf[..])), pat);
    }

    #[test]
    fn pointer_field_is_skipped() {
        let mut payload = vec![2, 0xAA, 0xBB];
        payload.extend_from_slice(&pat_payload()[1..]);
        let pat = track_try_unwrap!(Pat::read_from(&payload[..]));
        assert_eq!(pat.table.len(), 1);
    }

    #[test]
    fn wrong_table_id() {
        let mut payload = pat_payload().to_owned();
        payload[1] = 2;
        let e = Pat::read_from(&payload[..]).err().unwrap();
        assert_eq!(*e.kind(), ErrorKind::Crc32Mismatch);

        let pmt_like = {
            let pat = track_try_unwrap!(Pat::read_from(pat_payload()));
            let mut psi = track_try_unwrap!(pat.to_psi());
            psi.tables[0].header.table_id = 2;
            let mut buf = Vec::new();
            track_try_unwrap!(psi.write_to(&mut buf));
            buf
        };
        let e = Pat::read_from(&pmt_like[..]).err().unwrap();
        assert_eq!(*e.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn crc32_mismatch() {
        let mut payload = pat_payload().to_owned();
        payload[12] ^= 0x01;
        let e = Pat::read_from(&payload[..]).err().unwrap();
        assert_eq!(*e.kind(), ErrorKind::Crc32Mismatch);
    }

    #[test]
    fn truncated_section() {
        // section_length=255 over a 9 byte payload
        let payload = [0, 0x00, 0xB0, 0xFF, 0, 1, 0xC1, 0, 0];
        let e = Pat::read_from(&payload[..]).err().unwrap();
        assert_eq!(*e.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn duplicate_program_numbers() {
        let entry = ProgramAssociation {
            program_num: 1,
            program_map_pid: track_try_unwrap!(Pid::new(0x1000)),
        };
        let pat = Pat {
            transport_stream_id: 0,
            version_number: VersionNumber::new(),
            table: vec![entry.clone(), entry],
        };
        let e = pat.write_to(Vec::new()).err().unwrap();
        assert_eq!(*e.kind(), ErrorKind::InvalidInput);
    }
}
