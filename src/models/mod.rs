mod alimento;
mod consulta;
mod enums;
mod medicion;
mod paciente;
mod perfil_medico;
mod plan;
mod usuario;

pub use alimento::*;
pub use consulta::*;
pub use enums::*;
pub use medicion::*;
pub use paciente::*;
pub use perfil_medico::*;
pub use plan::*;
pub use usuario::*;
