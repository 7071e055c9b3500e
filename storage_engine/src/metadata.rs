//! The metadata page: relation name, indexed attribute, and current root.
//! Always PageId 1, per the index file layout.

use common::api::{PageId, PAGE_SIZE};
use common::attr::AttrType;

const MAX_RELATION_NAME_LEN: usize = 64;
const PAGE_ID_SIZE: usize = std::mem::size_of::<PageId>();

const NAME_LEN_OFFSET: usize = 0;
const NAME_OFFSET: usize = NAME_LEN_OFFSET + 2;
const ATTR_OFFSET_OFFSET: usize = NAME_OFFSET + MAX_RELATION_NAME_LEN;
const ATTR_TYPE_OFFSET: usize = ATTR_OFFSET_OFFSET + 4;
const ROOT_PAGE_OFFSET: usize = ATTR_TYPE_OFFSET + 1;
const ENCODED_SIZE: usize = ROOT_PAGE_OFFSET + PAGE_ID_SIZE;

const _: () = assert!(ENCODED_SIZE <= PAGE_SIZE, "metadata record must fit on one page");

/// `relation_name`, `attr_byte_offset`, and `attr_type` are fixed at index
/// creation and checked against the caller's declaration on every reopen;
/// `root_page_no` is the one field that changes, on every root promotion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMetadata {
    pub relation_name: String,
    pub attr_byte_offset: u32,
    pub attr_type: AttrType,
    pub root_page_no: PageId,
}

impl IndexMetadata {
    pub fn write(&self, data: &mut [u8]) {
        assert!(
            self.relation_name.len() <= MAX_RELATION_NAME_LEN,
            "relation name longer than the metadata page reserves"
        );
        data[..PAGE_SIZE].fill(0);

        let name_bytes = self.relation_name.as_bytes();
        data[NAME_LEN_OFFSET..NAME_LEN_OFFSET + 2].copy_from_slice(&(name_bytes.len() as u16).to_le_bytes());
        data[NAME_OFFSET..NAME_OFFSET + name_bytes.len()].copy_from_slice(name_bytes);
        data[ATTR_OFFSET_OFFSET..ATTR_OFFSET_OFFSET + 4].copy_from_slice(&self.attr_byte_offset.to_le_bytes());
        data[ATTR_TYPE_OFFSET] = self.attr_type.discriminant();
        data[ROOT_PAGE_OFFSET..ROOT_PAGE_OFFSET + PAGE_ID_SIZE].copy_from_slice(&self.root_page_no.to_le_bytes());
    }

    pub fn read(data: &[u8]) -> Self {
        let name_len = u16::from_le_bytes(data[NAME_LEN_OFFSET..NAME_LEN_OFFSET + 2].try_into().unwrap()) as usize;
        let relation_name = String::from_utf8_lossy(&data[NAME_OFFSET..NAME_OFFSET + name_len]).into_owned();
        let attr_byte_offset =
            u32::from_le_bytes(data[ATTR_OFFSET_OFFSET..ATTR_OFFSET_OFFSET + 4].try_into().unwrap());
        let attr_type = AttrType::from_discriminant(data[ATTR_TYPE_OFFSET])
            .expect("corrupt attr_type discriminant on metadata page");
        let root_page_no =
            PageId::from_le_bytes(data[ROOT_PAGE_OFFSET..ROOT_PAGE_OFFSET + PAGE_ID_SIZE].try_into().unwrap());

        Self { relation_name, attr_byte_offset, attr_type, root_page_no }
    }

    /// `"{relation_name}.{attr_byte_offset}"`, the external name of this
    /// index — supports a relation carrying more than one secondary index.
    pub fn index_name(&self) -> String {
        format!("{}.{}", self.relation_name, self.attr_byte_offset)
    }
}
