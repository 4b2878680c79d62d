//! Lookup of workbook parts inside OOXML and OpenDocument zip containers.

use crate::error::SheetTablesError;
use crate::helpers::xml::XmlReader;
use std::io::BufReader;
use std::io::Read;
use std::io::Seek;
use zip::read::ZipFile;
use zip::result::ZipError;
use zip::ZipArchive;

pub(crate) trait ZipHelper<RS: Read + Seek> {
    /// Finds an entry by name, ignoring ASCII case and accepting `\` as a separator.
    fn file(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, SheetTablesError>;

    /// Returns true when an entry with the given name exists.
    fn contains(&self, name: &str) -> bool;

    /// Opens an entry as an XML event stream.
    fn xml_reader(
        &'_ mut self,
        name: &str,
    ) -> Result<Option<XmlReader<BufReader<ZipFile<'_, RS>>>>, SheetTablesError>;
}

impl<RS: Read + Seek> ZipHelper<RS> for ZipArchive<RS> {
    fn file(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, SheetTablesError> {
        let path = match self.file_names().find(|file_name| same_entry(name, file_name)) {
            Some(file_name) => file_name.to_owned(),
            None => return Ok(None),
        };
        match self.by_name(&path) {
            Ok(file) => Ok(Some(file)),
            Err(ZipError::FileNotFound) => Ok(None),
            Err(error) => Err(error)?,
        }
    }

    fn contains(&self, name: &str) -> bool {
        self.file_names().any(|file_name| same_entry(name, file_name))
    }

    fn xml_reader(
        &'_ mut self,
        name: &str,
    ) -> Result<Option<XmlReader<BufReader<ZipFile<'_, RS>>>>, SheetTablesError> {
        Ok(self.file(name)?.map(|file| XmlReader::new(BufReader::new(file))))
    }
}

fn same_entry(name: &str, file_name: &str) -> bool {
    name.replace('\\', "/").eq_ignore_ascii_case(&file_name.replace('\\', "/"))
}
