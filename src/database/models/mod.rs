pub mod bahan_kajian;
pub mod cpl;
pub mod cpmk;
pub mod kurikulum;
pub mod mapping;
pub mod mata_kuliah;
pub mod profil_lulusan;
pub mod program_studi;
pub mod user;

pub use bahan_kajian::{BahanKajian, BkKategori};
pub use cpl::Cpl;
pub use cpmk::Cpmk;
pub use kurikulum::Kurikulum;
pub use mata_kuliah::MataKuliah;
pub use profil_lulusan::ProfilLulusan;
pub use program_studi::ProgramStudi;
pub use user::{User, UserView};
