use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// The stored/wire string is the literal, not the variant name.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $s)]
                $variant
            ),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(Sexo {
    Femenino => "F",
    Masculino => "M",
    Otro => "O",
});

str_enum!(EstadoConsulta {
    Programado => "PROGRAMADO",
    Confirmado => "CONFIRMADO",
    Cancelado => "CANCELADO",
    Ausente => "AUSENTE",
    Completado => "COMPLETADO",
    Reagendado => "REAGENDADO",
});

str_enum!(EstadoPago {
    Pagado => "PAGADO",
    Pendiente => "PENDIENTE",
});

str_enum!(EstadoPlan {
    Borrador => "BORRADOR",
    Activo => "ACTIVO",
    Finalizado => "FINALIZADO",
});
